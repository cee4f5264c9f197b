//! Trailing window and lag calculations
//!
//! Windows are "trailing": the value at position `i` covers positions
//! `i + 1 - window ..= i`, the current observation included.

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Trailing window of the last `window` observations
#[derive(Debug, Clone)]
pub struct RollingWindow {
    window: usize,
    min_periods: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl RollingWindow {
    /// Create a new window.
    ///
    /// Statistics are only reported once at least `min_periods` values are held.
    pub fn new(window: usize, min_periods: usize) -> Result<Self> {
        if window == 0 {
            return Err(MathError::InvalidInput(
                "Window must be greater than zero".to_string(),
            ));
        }
        if min_periods == 0 || min_periods > window {
            return Err(MathError::InvalidInput(format!(
                "min_periods must be within 1..={}, got {}",
                window, min_periods
            )));
        }

        Ok(Self {
            window,
            min_periods,
            values: VecDeque::with_capacity(window),
            sum: 0.0,
        })
    }

    /// Push a new observation, evicting the oldest once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.window {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Number of observations currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the window holds no observations
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether enough observations are held to report statistics
    pub fn is_ready(&self) -> bool {
        self.values.len() >= self.min_periods
    }

    /// Mean of the held observations
    pub fn mean(&self) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        Some(self.sum / self.values.len() as f64)
    }

    /// Sample standard deviation of the held observations
    pub fn std(&self) -> Option<f64> {
        if !self.is_ready() || self.values.len() < 2 {
            return None;
        }

        let n = self.values.len() as f64;
        let mean = self.sum / n;
        let squares: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum();

        Some((squares / (n - 1.0)).sqrt())
    }

    /// Window length
    pub fn window(&self) -> usize {
        self.window
    }

    /// Clear all observations
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Value `k` positions earlier, `None` for the first `k` positions
pub fn lagged(values: &[f64], k: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| i.checked_sub(k).map(|j| values[j]))
        .collect()
}

/// Trailing mean at every position
pub fn rolling_mean(values: &[f64], window: usize, min_periods: usize) -> Result<Vec<Option<f64>>> {
    let mut rolling = RollingWindow::new(window, min_periods)?;
    Ok(values
        .iter()
        .map(|&v| {
            rolling.update(v);
            rolling.mean()
        })
        .collect())
}

/// Trailing sample standard deviation at every position
pub fn rolling_std(values: &[f64], window: usize, min_periods: usize) -> Result<Vec<Option<f64>>> {
    let mut rolling = RollingWindow::new(window, min_periods)?;
    Ok(values
        .iter()
        .map(|&v| {
            rolling.update(v);
            rolling.std()
        })
        .collect())
}
