//! Pipeline configuration
//!
//! ```toml
//! [cleaning]
//! iqr_multiplier = 1.5
//!
//! [features]
//! lags = [1, 7, 30]
//! rolling_windows = [7, 30]
//! min_periods = 3
//!
//! [forecast]
//! horizon_weeks = 12
//! interval_width = 0.8
//! cohort_timeout_secs = 30
//! model = { kind = "holt", alpha = 0.4, beta = 0.2 }
//!
//! [inventory]
//! safety_stock_multiplier = 1.5
//! lead_time_weeks = 2
//! ```
//!
//! Every section and key is optional; missing ones take their defaults.

use crate::{PipelineError, Result};
use demand_forecast::cleaning::CleaningConfig;
use demand_forecast::features::FeatureConfig;
use demand_forecast::{ForecastConfig, ModelKind};
use inventory_plan::PolicyConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::mem;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cleaning: CleaningConfig,
    pub features: FeatureConfig,
    pub forecast: ForecastConfig,
    pub inventory: PolicyConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&content)
    }

    /// Reject any out-of-range parameter before processing starts
    pub fn validate(&self) -> Result<()> {
        self.cleaning
            .validate()
            .and_then(|_| self.features.validate())
            .and_then(|_| self.forecast.validate())
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        self.inventory
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        Ok(())
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(horizon) = overrides.horizon_weeks {
            self.forecast.horizon_weeks = horizon;
        }
        if let Some(lead_time) = overrides.lead_time_weeks {
            self.inventory.lead_time_weeks = lead_time;
        }
        if let Some(multiplier) = overrides.safety_stock_multiplier {
            self.inventory.safety_stock_multiplier = multiplier;
        }
        if let Some(name) = &overrides.model {
            let named =
                ModelKind::from_name(name).map_err(|e| PipelineError::Config(e.to_string()))?;
            // Naming the family already configured keeps the file's parameters
            if mem::discriminant(&named) != mem::discriminant(&self.forecast.model) {
                self.forecast.model = named;
            }
        }
        Ok(())
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub horizon_weeks: Option<usize>,
    pub lead_time_weeks: Option<u32>,
    pub safety_stock_multiplier: Option<f64>,
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.forecast.horizon_weeks, 12);
        assert_eq!(config.inventory.lead_time_weeks, 2);
        assert_eq!(config.features.lags, vec![1, 7, 30]);
    }

    #[test]
    fn test_partial_sections() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [forecast]
            forecast_horizon_weeks = 8
            model = { kind = "ses", alpha = 0.5 }

            [inventory]
            lead_time_weeks = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.forecast.horizon_weeks, 8);
        assert_eq!(config.forecast.model, ModelKind::Ses { alpha: 0.5 });
        assert_eq!(config.forecast.interval_width, 0.8);
        assert_eq!(config.inventory.lead_time_weeks, 3);
        assert_eq!(config.inventory.safety_stock_multiplier, 1.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = PipelineConfig::default();
        config
            .apply(&ConfigOverrides {
                horizon_weeks: Some(4),
                model: Some("moving_average".to_string()),
                ..ConfigOverrides::default()
            })
            .unwrap();

        assert_eq!(config.forecast.horizon_weeks, 4);
        assert_eq!(config.forecast.model, ModelKind::MovingAverage { window: 4 });

        let unknown = ConfigOverrides {
            model: Some("neural".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(config.apply(&unknown).is_err());
    }

    #[test]
    fn test_same_family_override_keeps_file_parameters() {
        let mut config = PipelineConfig::from_toml_str(
            r#"
            [forecast]
            model = { kind = "holt", alpha = 0.7, beta = 0.1 }
            "#,
        )
        .unwrap();

        config
            .apply(&ConfigOverrides {
                model: Some("holt".to_string()),
                ..ConfigOverrides::default()
            })
            .unwrap();
        assert_eq!(config.forecast.model, ModelKind::Holt { alpha: 0.7, beta: 0.1 });

        config
            .apply(&ConfigOverrides {
                model: Some("ses".to_string()),
                ..ConfigOverrides::default()
            })
            .unwrap();
        assert_eq!(config.forecast.model, ModelKind::Ses { alpha: 0.3 });
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.inventory.safety_stock_multiplier = 0.0;
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));

        let mut config = PipelineConfig::default();
        config.features.rolling_windows.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.forecast.horizon_weeks = 0;
        assert!(config.validate().is_err());
    }
}
