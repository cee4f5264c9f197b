//! Calendar, cyclical, lag and rolling features on the cleaned daily series
//!
//! Lags and windows are positional: they count rows within a cohort's
//! date-sorted sequence, not calendar days.

use crate::cleaning::CleanRecord;
use crate::data::cohort_spans;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use demand_math::{lagged, rolling_mean, rolling_std};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::info;

/// Feature construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Lag offsets in rows
    pub lags: Vec<usize>,
    /// Trailing window lengths in rows
    pub rolling_windows: Vec<usize>,
    /// Observations required before a window reports statistics
    pub min_periods: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            lags: vec![1, 7, 30],
            rolling_windows: vec![7, 30],
            min_periods: 3,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lags.is_empty() || self.lags.contains(&0) {
            return Err(ForecastError::InvalidParameter(format!(
                "lags must be a non-empty set of positive offsets, got {:?}",
                self.lags
            )));
        }
        if self.rolling_windows.is_empty() || self.rolling_windows.contains(&0) {
            return Err(ForecastError::InvalidParameter(format!(
                "rolling_windows must be a non-empty set of positive lengths, got {:?}",
                self.rolling_windows
            )));
        }
        if self.min_periods < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "min_periods must be at least 2, got {}",
                self.min_periods
            )));
        }
        if let Some(w) = self.rolling_windows.iter().find(|&&w| w < self.min_periods) {
            return Err(ForecastError::InvalidParameter(format!(
                "rolling window {} is shorter than min_periods {}",
                w, self.min_periods
            )));
        }
        Ok(())
    }
}

/// Calendar fields and their cyclical encodings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalendarFeatures {
    /// Monday = 0 .. Sunday = 6
    pub day_of_week: u32,
    /// ISO 8601 week number
    pub week_of_year: u32,
    pub month: u32,
    pub year: i32,
    pub is_weekend: bool,
    pub dow_sin: f64,
    pub dow_cos: f64,
    pub month_sin: f64,
    pub month_cos: f64,
}

impl CalendarFeatures {
    pub fn from_date(date: NaiveDate) -> Self {
        let day_of_week = date.weekday().num_days_from_monday();
        let month = date.month();
        let dow_angle = 2.0 * PI * day_of_week as f64 / 7.0;
        let month_angle = 2.0 * PI * month as f64 / 12.0;

        Self {
            day_of_week,
            week_of_year: date.iso_week().week(),
            month,
            year: date.year(),
            is_weekend: day_of_week >= 5,
            dow_sin: dow_angle.sin(),
            dow_cos: dow_angle.cos(),
            month_sin: month_angle.sin(),
            month_cos: month_angle.cos(),
        }
    }
}

/// Trailing mean and sample standard deviation, absent below `min_periods`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingStats {
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

/// A cleaned row with every derived feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturedRecord {
    pub base: CleanRecord,
    pub calendar: CalendarFeatures,
    /// Keyed by lag offset
    pub lags: BTreeMap<usize, Option<f64>>,
    /// Keyed by window length
    pub rolling: BTreeMap<usize, RollingStats>,
}

impl FeaturedRecord {
    pub fn lag(&self, k: usize) -> Option<f64> {
        self.lags.get(&k).copied().flatten()
    }

    pub fn rolling(&self, window: usize) -> RollingStats {
        self.rolling.get(&window).copied().unwrap_or_default()
    }
}

/// Builds [`FeaturedRecord`]s one cohort at a time
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    config: FeatureConfig,
}

impl FeatureBuilder {
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Derive features for every row.
    ///
    /// Rows are ordered by their `(cohort, seq)` key first, so the output is
    /// ordered by cohort and date whatever order the input arrives in.
    pub fn build(&self, records: &[CleanRecord]) -> Result<Vec<FeaturedRecord>> {
        let mut ordered = records.to_vec();
        ordered.sort_by(|a, b| a.cohort().cmp(b.cohort()).then(a.seq.cmp(&b.seq)));

        let spans = cohort_spans(&ordered, |r| r.cohort());
        let per_cohort = spans
            .par_iter()
            .map(|span| self.build_cohort(&ordered[span.clone()]))
            .collect::<Result<Vec<_>>>()?;

        let featured: Vec<FeaturedRecord> = per_cohort.into_iter().flatten().collect();
        info!(rows = featured.len(), cohorts = spans.len(), "built temporal features");
        Ok(featured)
    }

    fn build_cohort(&self, group: &[CleanRecord]) -> Result<Vec<FeaturedRecord>> {
        let quantities: Vec<f64> = group.iter().map(|r| r.sale.quantity_sold).collect();

        let lag_columns: Vec<(usize, Vec<Option<f64>>)> = self
            .config
            .lags
            .iter()
            .map(|&k| (k, lagged(&quantities, k)))
            .collect();

        let mut window_columns = Vec::with_capacity(self.config.rolling_windows.len());
        for &w in &self.config.rolling_windows {
            let means = rolling_mean(&quantities, w, self.config.min_periods)?;
            let stds = rolling_std(&quantities, w, self.config.min_periods)?;
            window_columns.push((w, means, stds));
        }

        Ok(group
            .iter()
            .enumerate()
            .map(|(i, record)| FeaturedRecord {
                base: record.clone(),
                calendar: CalendarFeatures::from_date(record.sale.date),
                lags: lag_columns.iter().map(|(k, col)| (*k, col[i])).collect(),
                rolling: window_columns
                    .iter()
                    .map(|(w, means, stds)| {
                        (
                            *w,
                            RollingStats {
                                mean: means[i],
                                std: stds[i],
                            },
                        )
                    })
                    .collect(),
            })
            .collect())
    }
}
