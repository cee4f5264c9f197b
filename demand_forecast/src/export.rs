//! Tabular export of stage artifacts
//!
//! Every artifact is laid out as a polars [`DataFrame`] and written with the
//! polars CSV writer. Dates are rendered as `YYYY-MM-DD` strings and missing
//! values as empty cells.

use crate::adapter::ForecastPoint;
use crate::error::Result;
use crate::features::FeaturedRecord;
use crate::metrics::CohortMetrics;
use crate::weekly::WeeklyAggregate;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

pub const PROCESSED_SALES_FILE: &str = "processed_sales_data.csv";
pub const WEEKLY_SALES_FILE: &str = "aggregated_weekly_sales.csv";
pub const METRICS_CSV_FILE: &str = "model_evaluation_metrics.csv";
pub const METRICS_JSON_FILE: &str = "model_metrics.json";

/// File name of the forecast table for a given horizon
pub fn forecast_file_name(horizon_weeks: usize) -> String {
    format!("sales_forecasts_{}weeks.csv", horizon_weeks)
}

fn date_strings<'a>(dates: impl Iterator<Item = &'a NaiveDate>) -> Vec<String> {
    dates.map(|d| d.format("%Y-%m-%d").to_string()).collect()
}

/// Featured daily rows, one column per derived feature
pub fn featured_frame(records: &[FeaturedRecord]) -> Result<DataFrame> {
    let mut columns = vec![
        Series::new("Date", date_strings(records.iter().map(|r| &r.base.sale.date))),
        Series::new(
            "Product",
            records
                .iter()
                .map(|r| r.base.sale.cohort.product.as_str())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "Region",
            records
                .iter()
                .map(|r| r.base.sale.cohort.region.as_str())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "Quantity_Sold",
            records.iter().map(|r| r.base.sale.quantity_sold).collect::<Vec<_>>(),
        ),
        Series::new(
            "Stock_Level",
            records.iter().map(|r| r.base.sale.stock_level).collect::<Vec<_>>(),
        ),
        Series::new(
            "day_of_week",
            records.iter().map(|r| r.calendar.day_of_week).collect::<Vec<_>>(),
        ),
        Series::new(
            "week_of_year",
            records.iter().map(|r| r.calendar.week_of_year).collect::<Vec<_>>(),
        ),
        Series::new("month", records.iter().map(|r| r.calendar.month).collect::<Vec<_>>()),
        Series::new("year", records.iter().map(|r| r.calendar.year).collect::<Vec<_>>()),
        Series::new(
            "is_weekend",
            records
                .iter()
                .map(|r| r.calendar.is_weekend as u32)
                .collect::<Vec<_>>(),
        ),
        Series::new("dow_sin", records.iter().map(|r| r.calendar.dow_sin).collect::<Vec<_>>()),
        Series::new("dow_cos", records.iter().map(|r| r.calendar.dow_cos).collect::<Vec<_>>()),
        Series::new(
            "month_sin",
            records.iter().map(|r| r.calendar.month_sin).collect::<Vec<_>>(),
        ),
        Series::new(
            "month_cos",
            records.iter().map(|r| r.calendar.month_cos).collect::<Vec<_>>(),
        ),
    ];

    let lags: BTreeSet<usize> = records.iter().flat_map(|r| r.lags.keys().copied()).collect();
    for k in lags {
        columns.push(Series::new(
            &format!("lag_{}", k),
            records.iter().map(|r| r.lag(k)).collect::<Vec<_>>(),
        ));
    }

    let windows: BTreeSet<usize> = records
        .iter()
        .flat_map(|r| r.rolling.keys().copied())
        .collect();
    for w in windows {
        columns.push(Series::new(
            &format!("roll_mean_{}", w),
            records.iter().map(|r| r.rolling(w).mean).collect::<Vec<_>>(),
        ));
        columns.push(Series::new(
            &format!("roll_std_{}", w),
            records.iter().map(|r| r.rolling(w).std).collect::<Vec<_>>(),
        ));
    }

    Ok(DataFrame::new(columns)?)
}

/// Weekly aggregate rows, readable again by [`crate::DataLoader::weekly_from_csv`]
pub fn weekly_frame(weekly: &[WeeklyAggregate]) -> Result<DataFrame> {
    let mut columns = vec![
        Series::new(
            "Product",
            weekly.iter().map(|w| w.cohort.product.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "Region",
            weekly.iter().map(|w| w.cohort.region.as_str()).collect::<Vec<_>>(),
        ),
        Series::new("WeekStartDate", date_strings(weekly.iter().map(|w| &w.week_start))),
        Series::new(
            "Weekly_Sales",
            weekly.iter().map(|w| w.weekly_sales).collect::<Vec<_>>(),
        ),
        Series::new(
            "Stock_Level",
            weekly.iter().map(|w| w.stock_level).collect::<Vec<_>>(),
        ),
    ];

    let windows: BTreeSet<usize> = weekly.iter().flat_map(|w| w.rolling.keys().copied()).collect();
    for window in windows {
        let stats = |w: &WeeklyAggregate| w.rolling.get(&window).copied().unwrap_or_default();
        columns.push(Series::new(
            &format!("roll_mean_{}", window),
            weekly.iter().map(|w| stats(w).mean).collect::<Vec<_>>(),
        ));
        columns.push(Series::new(
            &format!("roll_std_{}", window),
            weekly.iter().map(|w| stats(w).std).collect::<Vec<_>>(),
        ));
    }

    columns.push(Series::new(
        "Days_Observed",
        weekly.iter().map(|w| w.days_observed as u32).collect::<Vec<_>>(),
    ));

    Ok(DataFrame::new(columns)?)
}

/// Back-fit and future forecast rows
pub fn forecast_frame(points: &[ForecastPoint]) -> Result<DataFrame> {
    Ok(DataFrame::new(vec![
        Series::new(
            "Product",
            points.iter().map(|p| p.cohort.product.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "Region",
            points.iter().map(|p| p.cohort.region.as_str()).collect::<Vec<_>>(),
        ),
        Series::new("ds", date_strings(points.iter().map(|p| &p.ds))),
        Series::new("yhat", points.iter().map(|p| p.yhat).collect::<Vec<_>>()),
        Series::new("yhat_lower", points.iter().map(|p| p.yhat_lower).collect::<Vec<_>>()),
        Series::new("yhat_upper", points.iter().map(|p| p.yhat_upper).collect::<Vec<_>>()),
        Series::new("is_future", points.iter().map(|p| p.is_future).collect::<Vec<_>>()),
    ])?)
}

/// Per-cohort accuracy; an undefined MAPE stays null
pub fn metrics_frame(metrics: &[CohortMetrics]) -> Result<DataFrame> {
    Ok(DataFrame::new(vec![
        Series::new(
            "Product",
            metrics.iter().map(|m| m.cohort.product.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "Region",
            metrics.iter().map(|m| m.cohort.region.as_str()).collect::<Vec<_>>(),
        ),
        Series::new("MAE", metrics.iter().map(|m| m.mae).collect::<Vec<_>>()),
        Series::new("RMSE", metrics.iter().map(|m| m.rmse).collect::<Vec<_>>()),
        Series::new("MAPE", metrics.iter().map(|m| m.mape).collect::<Vec<_>>()),
        Series::new(
            "n_weeks",
            metrics.iter().map(|m| m.n_weeks as u32).collect::<Vec<_>>(),
        ),
    ])?)
}

/// Write a frame as CSV with a header row, creating parent directories
pub fn write_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).has_header(true).finish(df)?;

    debug!(rows = df.height(), path = %path.display(), "wrote csv");
    Ok(())
}

/// Write per-cohort metrics as a pretty-printed JSON array
pub fn write_metrics_json<P: AsRef<Path>>(metrics: &[CohortMetrics], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, metrics)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Cohort, DataLoader};
    use crate::features::RollingStats;
    use std::collections::BTreeMap;

    fn week(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn weekly_rows() -> Vec<WeeklyAggregate> {
        let cohort = Cohort::new("P1", "North");
        let mut rolling = BTreeMap::new();
        rolling.insert(
            7,
            RollingStats {
                mean: Some(4.5),
                std: None,
            },
        );

        vec![
            WeeklyAggregate {
                cohort: cohort.clone(),
                week_start: week(1),
                weekly_sales: 30.0,
                stock_level: Some(12.0),
                rolling: rolling.clone(),
                days_observed: 7,
            },
            WeeklyAggregate {
                cohort,
                week_start: week(8),
                weekly_sales: 27.5,
                stock_level: None,
                rolling,
                days_observed: 6,
            },
        ]
    }

    #[test]
    fn test_weekly_frame_columns() {
        let df = weekly_frame(&weekly_rows()).unwrap();
        let names: Vec<&str> = df.get_column_names();

        assert_eq!(
            names,
            vec![
                "Product",
                "Region",
                "WeekStartDate",
                "Weekly_Sales",
                "Stock_Level",
                "roll_mean_7",
                "roll_std_7",
                "Days_Observed"
            ]
        );
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_weekly_csv_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(WEEKLY_SALES_FILE);
        let rows = weekly_rows();

        write_csv(&mut weekly_frame(&rows).unwrap(), &path).unwrap();
        let loaded = DataLoader::weekly_from_csv(&path).unwrap();

        assert_eq!(loaded, rows);
    }

    #[test]
    fn test_metrics_json_keeps_null_mape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(METRICS_JSON_FILE);
        let metrics = vec![CohortMetrics {
            cohort: Cohort::new("P1", "North"),
            mae: 1.0,
            rmse: 1.0,
            mape: None,
            n_weeks: 3,
        }];

        write_metrics_json(&metrics, &path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert!(json[0]["MAPE"].is_null());
        assert_eq!(forecast_file_name(12), "sales_forecasts_12weeks.csv");
    }
}
