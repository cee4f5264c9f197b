//! Moving average model for weekly demand

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};

/// Trailing moving average model
#[derive(Debug, Clone)]
pub struct MovingAverage {
    /// Name of the model
    name: String,
    /// Window size in weeks
    window: usize,
}

/// Trained moving average model
#[derive(Debug, Clone)]
pub struct TrainedMovingAverage {
    /// Name of the model
    name: String,
    /// Window size in weeks
    window: usize,
    /// Average of the last `window` weeks
    last_average: f64,
}

impl MovingAverage {
    /// Create a new moving average model
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Moving Average (window={})", window),
            window,
        })
    }
}

impl ForecastModel for MovingAverage {
    type Trained = TrainedMovingAverage;

    fn train(&self, history: &[f64]) -> Result<Self::Trained> {
        if history.len() < self.window {
            return Err(ForecastError::InsufficientHistory {
                needed: self.window,
                got: history.len(),
            });
        }

        let tail = &history[history.len() - self.window..];
        let last_average = tail.iter().sum::<f64>() / self.window as f64;

        Ok(TrainedMovingAverage {
            name: self.name.clone(),
            window: self.window,
            last_average,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedMovingAverage {
    fn forecast(&self, horizons: usize) -> Result<ForecastResult> {
        // For a moving average, the forecast is constant at the last average
        ForecastResult::new(vec![self.last_average; horizons], horizons)
    }

    fn predict(&self, history: &[f64]) -> Result<ForecastResult> {
        if history.is_empty() {
            return Err(ForecastError::DataError("Empty weekly series".to_string()));
        }

        // Average of up to `window` preceding weeks; the first week predicts itself
        let predictions: Vec<f64> = (0..history.len())
            .map(|i| {
                if i == 0 {
                    history[0]
                } else {
                    let start = i.saturating_sub(self.window);
                    let prior = &history[start..i];
                    prior.iter().sum::<f64>() / prior.len() as f64
                }
            })
            .collect();

        ForecastResult::new(predictions, history.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_moving_average() {
        let model = MovingAverage::new(3).unwrap();
        let history = [100.0, 102.0, 104.0, 103.0, 105.0];
        let trained = model.train(&history).unwrap();

        let forecast = trained.forecast(2).unwrap();
        assert_relative_eq!(forecast.values()[0], 104.0);

        let fitted = trained.predict(&history).unwrap();
        assert_relative_eq!(fitted.values()[1], 100.0);
        assert_relative_eq!(fitted.values()[4], 103.0);
    }

    #[test]
    fn test_needs_a_full_window() {
        let model = MovingAverage::new(4).unwrap();
        assert!(matches!(
            model.train(&[1.0, 2.0]),
            Err(ForecastError::InsufficientHistory { needed: 4, got: 2 })
        ));
        assert!(MovingAverage::new(0).is_err());
    }
}
