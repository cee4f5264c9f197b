//! Holt's linear trend model

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use demand_math::DoubleExponentialSmoothing;

/// Holt's linear trend (double exponential smoothing)
#[derive(Debug, Clone)]
pub struct HoltLinear {
    /// Name of the model
    name: String,
    /// Level smoothing parameter
    alpha: f64,
    /// Trend smoothing parameter
    beta: f64,
}

/// Trained Holt model
#[derive(Debug, Clone)]
pub struct TrainedHoltLinear {
    name: String,
    alpha: f64,
    beta: f64,
    /// Smoother state after the whole history
    smoother: DoubleExponentialSmoothing,
}

impl HoltLinear {
    /// Weeks needed to seed level and trend
    pub const MIN_HISTORY: usize = 2;

    /// Create a new Holt model
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        // validate through the kernel so both crates agree on the bounds
        DoubleExponentialSmoothing::new(alpha, beta)
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;

        Ok(Self {
            name: format!("Holt Linear (alpha={}, beta={})", alpha, beta),
            alpha,
            beta,
        })
    }
}

impl ForecastModel for HoltLinear {
    type Trained = TrainedHoltLinear;

    fn train(&self, history: &[f64]) -> Result<Self::Trained> {
        if history.len() < Self::MIN_HISTORY {
            return Err(ForecastError::InsufficientHistory {
                needed: Self::MIN_HISTORY,
                got: history.len(),
            });
        }

        let mut smoother = DoubleExponentialSmoothing::new(self.alpha, self.beta)?;
        for &value in history {
            smoother.update(value);
        }

        Ok(TrainedHoltLinear {
            name: self.name.clone(),
            alpha: self.alpha,
            beta: self.beta,
            smoother,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedHoltLinear {
    fn forecast(&self, horizons: usize) -> Result<ForecastResult> {
        let values = (1..=horizons)
            .map(|h| self.smoother.forecast(h))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        ForecastResult::new(values, horizons)
    }

    fn predict(&self, history: &[f64]) -> Result<ForecastResult> {
        let first = *history
            .first()
            .ok_or_else(|| ForecastError::DataError("Empty weekly series".to_string()))?;

        let mut smoother = DoubleExponentialSmoothing::new(self.alpha, self.beta)?;
        let mut predictions = Vec::with_capacity(history.len());

        // Nothing precedes the first week, so it predicts itself
        predictions.push(first);
        smoother.update(first);

        for &value in &history[1..] {
            predictions.push(smoother.forecast(1)?);
            smoother.update(value);
        }

        ForecastResult::new(predictions, history.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
