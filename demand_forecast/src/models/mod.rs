//! Forecasting models for weekly demand series
//!
//! A model is trained on a cohort's weekly sales and then asked for a
//! back-fit over the history plus a number of future weeks. Any type that
//! implements [`ForecastModel`] is usable through the object-safe
//! [`Forecaster`] interface the adapter works with.

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::Debug;
use std::sync::Arc;

pub mod exponential_smoothing;
pub mod holt;
pub mod moving_average;

pub use exponential_smoothing::ExponentialSmoothing;
pub use holt::HoltLinear;
pub use moving_average::MovingAverage;

/// Forecast result containing predicted values
#[derive(Debug, Clone)]
pub struct ForecastResult {
    /// Forecasted values
    pub(crate) values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }

        Ok(Self { values, horizons })
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    /// Residuals `actual - predicted` against an aligned series
    pub fn residuals(&self, actual: &[f64]) -> Result<Vec<f64>> {
        if self.values.len() != actual.len() {
            return Err(ForecastError::ValidationError(format!(
                "Forecast length ({}) doesn't match actual length ({})",
                self.values.len(),
                actual.len()
            )));
        }

        Ok(actual
            .iter()
            .zip(self.values.iter())
            .map(|(a, f)| a - f)
            .collect())
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug + Send {
    /// Generate forecast for the periods following the training data
    fn forecast(&self, horizons: usize) -> Result<ForecastResult>;

    /// One-step-ahead predictions aligned with the training data
    fn predict(&self, history: &[f64]) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a weekly series
pub trait ForecastModel: Debug + Clone + Send + Sync {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on weekly values
    fn train(&self, history: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// What a forecaster is asked for
#[derive(Debug, Clone, Copy)]
pub struct ForecastRequest<'a> {
    /// Historical week starts, strictly increasing
    pub weeks: &'a [NaiveDate],
    /// Weekly sales aligned with `weeks`
    pub values: &'a [f64],
    /// Future weeks wanted
    pub horizon: usize,
    /// Central coverage of the prediction interval, in (0, 1)
    pub interval_width: f64,
}

/// One predicted week
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRow {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Object-safe forecasting interface.
///
/// Returns `weeks.len() + horizon` rows: the back-fit aligned with the
/// input weeks, then one row per future week at 7-day steps.
pub trait Forecaster: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn fit_predict(&self, request: &ForecastRequest<'_>) -> Result<Vec<ModelRow>>;
}

impl<M: ForecastModel> Forecaster for M {
    fn name(&self) -> &str {
        ForecastModel::name(self)
    }

    fn fit_predict(&self, request: &ForecastRequest<'_>) -> Result<Vec<ModelRow>> {
        let last_week = match request.weeks.last() {
            Some(week) if request.weeks.len() == request.values.len() => *week,
            _ => {
                return Err(ForecastError::DataError(format!(
                    "Series has {} weeks and {} values",
                    request.weeks.len(),
                    request.values.len()
                )))
            }
        };

        let trained = self.train(request.values)?;
        let fitted = trained.predict(request.values)?;
        let future = trained.forecast(request.horizon)?;

        let residuals = fitted.residuals(request.values)?;
        let sigma = demand_math::sample_std(&residuals).unwrap_or(0.0);
        let z = normal_quantile(request.interval_width)?;

        let history = request
            .weeks
            .iter()
            .zip(fitted.values())
            .map(|(&ds, &yhat)| interval_row(ds, yhat, z * sigma));
        let ahead = future.values().iter().enumerate().map(|(i, &yhat)| {
            let step = (i + 1) as i64;
            let margin = z * sigma * (step as f64).sqrt();
            interval_row(last_week + Duration::weeks(step), yhat, margin)
        });

        Ok(history.chain(ahead).collect())
    }
}

fn interval_row(ds: NaiveDate, yhat: f64, margin: f64) -> ModelRow {
    ModelRow {
        ds,
        yhat,
        yhat_lower: yhat - margin,
        yhat_upper: yhat + margin,
    }
}

/// Two-sided standard normal quantile for a central interval of `width`
pub fn normal_quantile(width: f64) -> Result<f64> {
    if !(width > 0.0 && width < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "interval width must be between 0 and 1, got {}",
            width
        )));
    }

    let normal =
        Normal::new(0.0, 1.0).map_err(|e| ForecastError::ForecastingError(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + width / 2.0))
}

/// Model family selection, as written in configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    /// Holt's linear trend method
    Holt { alpha: f64, beta: f64 },
    /// Simple exponential smoothing
    Ses { alpha: f64 },
    /// Trailing moving average
    MovingAverage { window: usize },
}

impl Default for ModelKind {
    fn default() -> Self {
        ModelKind::Holt {
            alpha: 0.4,
            beta: 0.2,
        }
    }
}

impl ModelKind {
    /// Family by name with its default parameters
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "holt" => Ok(ModelKind::default()),
            "ses" | "exponential_smoothing" => Ok(ModelKind::Ses { alpha: 0.3 }),
            "moving_average" | "ma" => Ok(ModelKind::MovingAverage { window: 4 }),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown model '{}', expected holt, ses or moving_average",
                other
            ))),
        }
    }

    /// Instantiate the model, validating its parameters
    pub fn build(&self) -> Result<Arc<dyn Forecaster>> {
        let model: Arc<dyn Forecaster> = match *self {
            ModelKind::Holt { alpha, beta } => Arc::new(HoltLinear::new(alpha, beta)?),
            ModelKind::Ses { alpha } => Arc::new(ExponentialSmoothing::new(alpha)?),
            ModelKind::MovingAverage { window } => Arc::new(MovingAverage::new(window)?),
        };
        Ok(model)
    }
}
