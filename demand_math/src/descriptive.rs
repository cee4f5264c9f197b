//! Descriptive statistics over demand samples
//!
//! Contains:
//! - Mean and sample standard deviation
//! - Quantiles with linear interpolation between closest ranks
//! - Tukey fences (IQR outlier bounds)

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Arithmetic mean, `None` for an empty sample
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Sample standard deviation (n - 1 denominator), `None` with fewer than two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(values.iter().std_dev())
}

/// Quantile `q` of `values` using linear interpolation.
///
/// The position is `h = (n - 1) * q` over the sorted sample and the result
/// interpolates between the two closest ranks, which matches the default
/// quantile definition of numpy and pandas.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must be within [0, 1], got {}",
            q
        )));
    }
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute a quantile of an empty sample".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;

    Ok(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Outlier fences derived from the interquartile range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fences {
    /// First quartile
    pub q1: f64,
    /// Third quartile
    pub q3: f64,
    /// Lowest value kept
    pub lower: f64,
    /// Highest value kept
    pub upper: f64,
}

impl Fences {
    /// Interquartile range
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Whether `value` lies inside the closed interval `[lower, upper]`
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Compute `[Q1 - k * IQR, Q3 + k * IQR]` for the sample
pub fn iqr_fences(values: &[f64], multiplier: f64) -> Result<Fences> {
    if multiplier < 0.0 || !multiplier.is_finite() {
        return Err(MathError::InvalidInput(format!(
            "IQR multiplier must be a non-negative finite number, got {}",
            multiplier
        )));
    }

    let q1 = quantile(values, 0.25)?;
    let q3 = quantile(values, 0.75)?;
    let iqr = q3 - q1;

    Ok(Fences {
        q1,
        q3,
        lower: q1 - multiplier * iqr,
        upper: q3 + multiplier * iqr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_mean_and_std() {
        let sales = [10.0, 12.0, 11.0, 9.0, 10.0, 13.0];
        assert_relative_eq!(mean(&sales).unwrap(), 10.833333, epsilon = 1e-6);
        assert_relative_eq!(sample_std(&sales).unwrap(), 1.471960, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_samples() {
        assert!(mean(&[]).is_none());
        assert!(sample_std(&[4.0]).is_none());
        assert_eq!(sample_std(&[4.0, 4.0]), Some(0.0));
    }

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(0.25, 1.75)]
    #[case(0.5, 2.5)]
    #[case(0.75, 3.25)]
    #[case(1.0, 4.0)]
    fn test_linear_quantile(#[case] q: f64, #[case] expected: f64) {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(quantile(&values, q).unwrap(), expected);
    }

    #[test]
    fn test_quantile_rejects_bad_input() {
        assert!(quantile(&[], 0.5).is_err());
        assert!(quantile(&[1.0], 1.5).is_err());
    }

    #[test]
    fn test_iqr_fences() {
        let values = [10.0, 10.0, 10.0, 11.0, 11.0, 11.0, 12.0, 12.0, 13.0, 95.0];
        let fences = iqr_fences(&values, 1.5).unwrap();

        assert_relative_eq!(fences.q1, 10.25);
        assert_relative_eq!(fences.q3, 12.0);
        assert_relative_eq!(fences.iqr(), 1.75);
        assert!(fences.contains(13.0));
        assert!(!fences.contains(95.0));
    }

    #[test]
    fn test_constant_sample_keeps_its_value() {
        let fences = iqr_fences(&[5.0, 5.0, 5.0, 5.0], 1.5).unwrap();
        assert!(fences.contains(5.0));
        assert!(!fences.contains(5.5));
    }
}
