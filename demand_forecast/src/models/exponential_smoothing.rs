//! Simple exponential smoothing model

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};

/// Simple exponential smoothing model
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    /// Name of the model
    name: String,
    /// Smoothing parameter
    alpha: f64,
}

/// Trained exponential smoothing model
#[derive(Debug, Clone)]
pub struct TrainedExponentialSmoothing {
    /// Name of the model
    name: String,
    /// Smoothing parameter
    alpha: f64,
    /// Level after the whole history
    level: f64,
}

impl ExponentialSmoothing {
    /// Create a new exponential smoothing model
    pub fn new(alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha >= 1.0 || alpha.is_nan() {
            return Err(ForecastError::InvalidParameter(
                "Alpha must be between 0 and 1".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Exponential Smoothing (alpha={})", alpha),
            alpha,
        })
    }
}

impl ForecastModel for ExponentialSmoothing {
    type Trained = TrainedExponentialSmoothing;

    fn train(&self, history: &[f64]) -> Result<Self::Trained> {
        let mut smoother = demand_math::ExponentialSmoothing::new(self.alpha)?;
        for &value in history {
            smoother.update(value);
        }

        let level = smoother
            .forecast()
            .map_err(|_| ForecastError::InsufficientHistory { needed: 1, got: 0 })?;

        Ok(TrainedExponentialSmoothing {
            name: self.name.clone(),
            alpha: self.alpha,
            level,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedExponentialSmoothing {
    fn forecast(&self, horizons: usize) -> Result<ForecastResult> {
        // In simple exponential smoothing, the forecast is constant at the last level
        ForecastResult::new(vec![self.level; horizons], horizons)
    }

    fn predict(&self, history: &[f64]) -> Result<ForecastResult> {
        if history.is_empty() {
            return Err(ForecastError::DataError("Empty weekly series".to_string()));
        }

        let mut smoother = demand_math::ExponentialSmoothing::new(self.alpha)?;
        let mut predictions = Vec::with_capacity(history.len());

        for &value in history {
            // Before the first update there is no level; the first week predicts itself
            predictions.push(smoother.forecast().unwrap_or(value));
            smoother.update(value);
        }

        ForecastResult::new(predictions, history.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
