//! Accuracy metrics for a model's back-fit against actual weekly sales

use crate::data::Cohort;
use crate::error::{ForecastError, Result};
use serde::Serialize;
use std::fmt;

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error over non-zero actuals.
    ///
    /// `None` when every actual is zero.
    pub mape: Option<f64>,
}

impl fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:  {:.4}", self.mae)?;
        writeln!(f, "  MSE:  {:.4}", self.mse)?;
        writeln!(f, "  RMSE: {:.4}", self.rmse)?;
        match self.mape {
            Some(mape) => writeln!(f, "  MAPE: {:.4}%", mape)?,
            None => writeln!(f, "  MAPE: undefined")?,
        }
        Ok(())
    }
}

/// Calculate accuracy of `forecast` against `actual`
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;

    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    // Averaged over the weeks that had demand, not over all weeks
    let percentages: Vec<f64> = actual
        .iter()
        .zip(errors.iter())
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| (e.abs() / a.abs()) * 100.0)
        .collect();
    let mape = (!percentages.is_empty())
        .then(|| percentages.iter().sum::<f64>() / percentages.len() as f64);

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse,
        mape,
    })
}

/// Back-fit accuracy of one cohort
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortMetrics {
    #[serde(flatten)]
    pub cohort: Cohort,
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    #[serde(rename = "MAPE")]
    pub mape: Option<f64>,
    pub n_weeks: usize,
}

impl CohortMetrics {
    /// Score a back-fit against the cohort's weekly sales
    pub fn evaluate(cohort: Cohort, fitted: &[f64], actual: &[f64]) -> Result<Self> {
        let accuracy = forecast_accuracy(fitted, actual)?;
        Ok(Self {
            cohort,
            mae: accuracy.mae,
            rmse: accuracy.rmse,
            mape: accuracy.mape,
            n_weeks: actual.len(),
        })
    }
}
