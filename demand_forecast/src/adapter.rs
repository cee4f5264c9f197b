//! Per-cohort forecasting with partial-failure semantics
//!
//! Each cohort's weekly series is handed to a [`Forecaster`] on a worker
//! thread. The adapter waits with a deadline, checks the returned rows
//! against the `len + horizon` contract and scores the back-fit. A cohort
//! that fails in any of these steps is recorded and skipped; the others
//! carry on.

use crate::data::Cohort;
use crate::error::{ForecastError, Result};
use crate::metrics::CohortMetrics;
use crate::models::{normal_quantile, ForecastRequest, Forecaster, ModelKind, ModelRow};
use crate::weekly::{cohort_series, CohortSeries, WeeklyAggregate};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Forecasting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Future weeks to forecast
    #[serde(alias = "forecast_horizon_weeks")]
    pub horizon_weeks: usize,
    /// Central coverage of the prediction intervals
    pub interval_width: f64,
    /// Deadline for one cohort's fit
    pub cohort_timeout_secs: u64,
    pub model: ModelKind,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_weeks: 12,
            interval_width: 0.8,
            cohort_timeout_secs: 30,
            model: ModelKind::default(),
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<()> {
        if self.horizon_weeks == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon_weeks must be positive".to_string(),
            ));
        }
        if self.cohort_timeout_secs == 0 {
            return Err(ForecastError::InvalidParameter(
                "cohort_timeout_secs must be positive".to_string(),
            ));
        }
        normal_quantile(self.interval_width)?;
        self.model.build()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.cohort_timeout_secs)
    }
}

/// One forecast week of one cohort
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    #[serde(flatten)]
    pub cohort: Cohort,
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    /// False for back-fit rows over the history
    pub is_future: bool,
}

/// Why a cohort was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InsufficientHistory,
    Model,
    ContractViolation,
    Timeout,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureReason::InsufficientHistory => "insufficient history",
            FailureReason::Model => "model error",
            FailureReason::ContractViolation => "contract violation",
            FailureReason::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

/// A cohort the adapter could not forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortFailure {
    pub cohort: Cohort,
    pub reason: FailureReason,
    pub detail: String,
}

impl CohortFailure {
    fn new(cohort: &Cohort, reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            cohort: cohort.clone(),
            reason,
            detail: detail.into(),
        }
    }

    fn from_error(cohort: &Cohort, err: ForecastError) -> Self {
        let reason = match err {
            ForecastError::InsufficientHistory { .. } => FailureReason::InsufficientHistory,
            _ => FailureReason::Model,
        };
        Self::new(cohort, reason, err.to_string())
    }
}

impl fmt::Display for CohortFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.cohort, self.reason, self.detail)
    }
}

/// Everything one forecasting run produced
#[derive(Debug, Clone, Default)]
pub struct ForecastRun {
    /// Ordered by cohort, then week
    pub points: Vec<ForecastPoint>,
    pub metrics: Vec<CohortMetrics>,
    pub failures: Vec<CohortFailure>,
}

impl ForecastRun {
    pub fn cohorts_forecast(&self) -> usize {
        self.metrics.len()
    }

    pub fn future_points(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.is_future)
    }
}

type CohortOutcome = std::result::Result<(Vec<ForecastPoint>, CohortMetrics), CohortFailure>;

/// Drives a [`Forecaster`] over every cohort of a weekly aggregate
#[derive(Debug, Clone)]
pub struct ForecastAdapter {
    config: ForecastConfig,
    model: Arc<dyn Forecaster>,
}

impl ForecastAdapter {
    /// Adapter for the model family named in `config`
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        let model = config.model.build()?;
        Ok(Self { config, model })
    }

    /// Adapter around a caller-supplied model; `config.model` is ignored
    pub fn with_model(config: ForecastConfig, model: Arc<dyn Forecaster>) -> Result<Self> {
        if config.horizon_weeks == 0 || config.cohort_timeout_secs == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon_weeks and cohort_timeout_secs must be positive".to_string(),
            ));
        }
        normal_quantile(config.interval_width)?;
        Ok(Self { config, model })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast every cohort in `weekly`.
    ///
    /// Only an empty aggregate is an error. Cohort-level problems end up in
    /// [`ForecastRun::failures`].
    pub fn run(&self, weekly: &[WeeklyAggregate]) -> Result<ForecastRun> {
        if weekly.is_empty() {
            return Err(ForecastError::MissingInput(
                "weekly aggregate has no rows".to_string(),
            ));
        }

        let series = cohort_series(weekly);
        info!(
            cohorts = series.len(),
            model = self.model.name(),
            horizon = self.config.horizon_weeks,
            "forecasting weekly demand"
        );

        let outcomes: Vec<CohortOutcome> =
            series.par_iter().map(|s| self.forecast_cohort(s)).collect();

        let mut run = ForecastRun::default();
        for outcome in outcomes {
            match outcome {
                Ok((points, metrics)) => {
                    run.points.extend(points);
                    run.metrics.push(metrics);
                }
                Err(failure) => {
                    warn!(
                        cohort = %failure.cohort,
                        reason = %failure.reason,
                        detail = %failure.detail,
                        "skipping cohort"
                    );
                    run.failures.push(failure);
                }
            }
        }

        info!(
            forecast = run.metrics.len(),
            skipped = run.failures.len(),
            "forecasting finished"
        );
        Ok(run)
    }

    fn forecast_cohort(&self, series: &CohortSeries) -> CohortOutcome {
        let cohort = &series.cohort;
        let rows = self.fit_with_deadline(series)?;
        self.check_contract(series, &rows)
            .map_err(|detail| CohortFailure::new(cohort, FailureReason::ContractViolation, detail))?;

        let n = series.len();
        let fitted: Vec<f64> = rows[..n].iter().map(|r| r.yhat).collect();
        let metrics = CohortMetrics::evaluate(cohort.clone(), &fitted, &series.sales)
            .map_err(|e| CohortFailure::from_error(cohort, e))?;
        debug!(cohort = %cohort, weeks = n, mae = metrics.mae, "cohort forecast");

        let points = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| ForecastPoint {
                cohort: cohort.clone(),
                ds: row.ds,
                yhat: row.yhat,
                yhat_lower: row.yhat_lower,
                yhat_upper: row.yhat_upper,
                is_future: i >= n,
            })
            .collect();

        Ok((points, metrics))
    }

    fn fit_with_deadline(
        &self,
        series: &CohortSeries,
    ) -> std::result::Result<Vec<ModelRow>, CohortFailure> {
        let cohort = &series.cohort;
        let (tx, rx) = mpsc::channel();
        let model = Arc::clone(&self.model);
        let weeks = series.weeks.clone();
        let values = series.sales.clone();
        let horizon = self.config.horizon_weeks;
        let interval_width = self.config.interval_width;

        thread::Builder::new()
            .name(format!("fit-{}", cohort))
            .spawn(move || {
                let request = ForecastRequest {
                    weeks: &weeks,
                    values: &values,
                    horizon,
                    interval_width,
                };
                // The receiver is gone once the deadline has passed
                let _ = tx.send(model.fit_predict(&request));
            })
            .map_err(|e| CohortFailure::new(cohort, FailureReason::Model, e.to_string()))?;

        match rx.recv_timeout(self.config.timeout()) {
            Ok(Ok(rows)) => Ok(rows),
            Ok(Err(err)) => Err(CohortFailure::from_error(cohort, err)),
            Err(RecvTimeoutError::Timeout) => Err(CohortFailure::new(
                cohort,
                FailureReason::Timeout,
                format!("no result within {}s", self.config.cohort_timeout_secs),
            )),
            Err(RecvTimeoutError::Disconnected) => Err(CohortFailure::new(
                cohort,
                FailureReason::Model,
                "model worker exited without a result",
            )),
        }
    }

    fn check_contract(&self, series: &CohortSeries, rows: &[ModelRow]) -> std::result::Result<(), String> {
        let expected = series.len() + self.config.horizon_weeks;
        if rows.len() != expected {
            return Err(format!("expected {} rows, got {}", expected, rows.len()));
        }

        if let Some((i, _)) = series
            .weeks
            .iter()
            .zip(rows)
            .enumerate()
            .find(|(_, (week, row))| **week != row.ds)
        {
            return Err(format!("back-fit row {} is not aligned with its week", i));
        }

        if rows.windows(2).any(|w| w[0].ds >= w[1].ds) {
            return Err("weeks are not strictly increasing".to_string());
        }

        if rows
            .iter()
            .any(|r| !(r.yhat.is_finite() && r.yhat_lower.is_finite() && r.yhat_upper.is_finite()))
        {
            return Err("non-finite prediction".to_string());
        }

        Ok(())
    }
}
