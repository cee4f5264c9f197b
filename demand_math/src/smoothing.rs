//! Exponential smoothing recursions
//!
//! Contains:
//! - Simple Exponential Smoothing (level only)
//! - Double Exponential Smoothing (Holt's linear trend method)

use crate::{MathError, Result};

fn check_factor(name: &str, value: f64) -> Result<()> {
    if value <= 0.0 || value >= 1.0 || value.is_nan() {
        return Err(MathError::InvalidInput(format!(
            "{} must be between 0 and 1 (exclusive), got {}",
            name, value
        )));
    }
    Ok(())
}

/// Simple Exponential Smoothing
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    alpha: f64,
    level: Option<f64>,
    values_seen: usize,
}

impl ExponentialSmoothing {
    /// Create a new Exponential Smoothing with the specified alpha (smoothing factor)
    pub fn new(alpha: f64) -> Result<Self> {
        check_factor("Alpha", alpha)?;

        Ok(Self {
            alpha,
            level: None,
            values_seen: 0,
        })
    }

    /// Fold a new observation into the level
    pub fn update(&mut self, value: f64) {
        self.values_seen += 1;

        self.level = Some(match self.level {
            None => value,
            Some(level) => self.alpha * value + (1.0 - self.alpha) * level,
        });
    }

    /// Current level, which is also the forecast for every future step
    pub fn forecast(&self) -> Result<f64> {
        self.level.ok_or_else(|| {
            MathError::InsufficientData("No data available for exponential smoothing".to_string())
        })
    }

    /// Get the current alpha value
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Number of observations folded in so far
    pub fn values_seen(&self) -> usize {
        self.values_seen
    }

    /// Reset the smoother, clearing all state
    pub fn reset(&mut self) {
        self.level = None;
        self.values_seen = 0;
    }
}

/// Double Exponential Smoothing (Holt's Method)
#[derive(Debug, Clone)]
pub struct DoubleExponentialSmoothing {
    alpha: f64,
    beta: f64,
    state: Option<(f64, f64)>,
    values_seen: usize,
}

impl DoubleExponentialSmoothing {
    /// Create a new Double Exponential Smoothing with the specified parameters
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        check_factor("Alpha", alpha)?;
        check_factor("Beta", beta)?;

        Ok(Self {
            alpha,
            beta,
            state: None,
            values_seen: 0,
        })
    }

    /// Fold a new observation into level and trend.
    ///
    /// The first observation seeds the level, the second seeds the trend as
    /// the first difference; the recursion runs from the third on.
    pub fn update(&mut self, value: f64) {
        self.values_seen += 1;

        self.state = Some(match (self.state, self.values_seen) {
            (None, _) => (value, 0.0),
            (Some((level, _)), 2) => (value, value - level),
            (Some((level, trend)), _) => {
                let new_level = self.alpha * value + (1.0 - self.alpha) * (level + trend);
                let new_trend = self.beta * (new_level - level) + (1.0 - self.beta) * trend;
                (new_level, new_trend)
            }
        });
    }

    /// Forecast h steps ahead of the last observation
    pub fn forecast(&self, h: usize) -> Result<f64> {
        match self.state {
            Some((level, trend)) => Ok(level + h as f64 * trend),
            None => Err(MathError::InsufficientData(
                "Not enough data to make a forecast".to_string(),
            )),
        }
    }

    /// Get the current level
    pub fn level(&self) -> Result<f64> {
        self.state.map(|(level, _)| level).ok_or_else(|| {
            MathError::InsufficientData("Level not calculated yet".to_string())
        })
    }

    /// Get the current trend
    pub fn trend(&self) -> Result<f64> {
        self.state.map(|(_, trend)| trend).ok_or_else(|| {
            MathError::InsufficientData("Trend not calculated yet".to_string())
        })
    }

    /// Number of observations folded in so far
    pub fn values_seen(&self) -> usize {
        self.values_seen
    }

    /// Reset the smoother, clearing all state
    pub fn reset(&mut self) {
        self.state = None;
        self.values_seen = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exponential_smoothing() {
        let mut es = ExponentialSmoothing::new(0.3).unwrap();
        assert!(es.forecast().is_err());

        es.update(10.0); // Initial level = 10
        assert_relative_eq!(es.forecast().unwrap(), 10.0);

        es.update(20.0); // New level = 0.3*20 + 0.7*10 = 13
        assert_relative_eq!(es.forecast().unwrap(), 13.0, epsilon = 1e-9);
    }

    #[test]
    fn test_double_exponential_smoothing_follows_a_line() {
        let mut des = DoubleExponentialSmoothing::new(0.4, 0.3).unwrap();
        for v in [10.0, 20.0, 30.0, 40.0] {
            des.update(v);
        }

        // A perfect line is reproduced exactly once the trend is seeded
        assert_relative_eq!(des.level().unwrap(), 40.0, epsilon = 1e-9);
        assert_relative_eq!(des.trend().unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(des.forecast(2).unwrap(), 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_factors() {
        assert!(ExponentialSmoothing::new(0.0).is_err());
        assert!(ExponentialSmoothing::new(1.0).is_err());
        assert!(DoubleExponentialSmoothing::new(0.5, 1.2).is_err());
        assert!(DoubleExponentialSmoothing::new(f64::NAN, 0.2).is_err());
    }
}
