//! Sales records, cohorts and CSV loading

use crate::error::{ForecastError, Result};
use crate::features::RollingStats;
use crate::weekly::WeeklyAggregate;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info};

/// Columns every raw sales file must carry
pub const REQUIRED_SALES_COLUMNS: [&str; 4] = ["Date", "Product", "Region", "Quantity_Sold"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A (product, region) pair, the unit of independent processing
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cohort {
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Region")]
    pub region: String,
}

impl Cohort {
    pub fn new(product: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.product, self.region)
    }
}

/// One row of a raw sales file, every field possibly missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSalesRow {
    #[serde(rename = "Date", default)]
    pub date: Option<String>,
    #[serde(rename = "Product", default)]
    pub product: Option<String>,
    #[serde(rename = "Region", default)]
    pub region: Option<String>,
    #[serde(
        rename = "Quantity_Sold",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub quantity_sold: Option<f64>,
    #[serde(rename = "Stock_Level", default, deserialize_with = "csv::invalid_option")]
    pub stock_level: Option<f64>,
}

/// A validated daily sales observation
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub cohort: Cohort,
    pub quantity_sold: f64,
    pub stock_level: Option<f64>,
}

impl SalesRecord {
    pub fn new(
        date: NaiveDate,
        cohort: Cohort,
        quantity_sold: f64,
        stock_level: Option<f64>,
    ) -> Self {
        Self {
            date,
            cohort,
            quantity_sold,
            stock_level,
        }
    }

    /// Validate a raw row.
    ///
    /// Returns `None` when the date does not parse or when product, region or
    /// quantity is missing. A non-finite stock level is read as missing.
    pub fn from_raw(raw: &RawSalesRow) -> Option<Self> {
        let date = raw.date.as_deref().and_then(parse_date)?;
        let product = non_blank(raw.product.as_deref())?;
        let region = non_blank(raw.region.as_deref())?;
        let quantity_sold = raw.quantity_sold.filter(|q| q.is_finite())?;
        let stock_level = raw.stock_level.filter(|s| s.is_finite());

        Some(Self {
            date,
            cohort: Cohort::new(product, region),
            quantity_sold,
            stock_level,
        })
    }

    /// Back to the raw representation, e.g. for writing a sales file
    pub fn to_raw(&self) -> RawSalesRow {
        RawSalesRow {
            date: Some(self.date.format("%Y-%m-%d").to_string()),
            product: Some(self.cohort.product.clone()),
            region: Some(self.cohort.region.clone()),
            quantity_sold: Some(self.quantity_sold),
            stock_level: self.stock_level,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parse a calendar date, discarding any time of day
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Contiguous index ranges sharing the same cohort.
///
/// `items` must already be ordered so that each cohort is contiguous.
pub fn cohort_spans<T, F>(items: &[T], cohort_of: F) -> Vec<Range<usize>>
where
    F: Fn(&T) -> &Cohort,
{
    let mut spans = Vec::new();
    let mut start = 0;

    for i in 1..=items.len() {
        if i == items.len() || cohort_of(&items[i]) != cohort_of(&items[start]) {
            if start < i {
                spans.push(start..i);
            }
            start = i;
        }
    }

    spans
}

/// Loader for the CSV artifacts the pipeline consumes
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Read raw sales rows.
    ///
    /// A missing required column is an error; missing or malformed values are
    /// kept as `None` and left for the cleaner to drop.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawSalesRow>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::MissingInput(format!(
                "sales file {} not found",
                path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(File::open(path)?);

        let headers = reader.headers()?.clone();
        for required in REQUIRED_SALES_COLUMNS {
            if !headers.iter().any(|h| h == required) {
                return Err(ForecastError::DataError(format!(
                    "{} is missing required column '{}'",
                    path.display(),
                    required
                )));
            }
        }

        let mut rows = Vec::new();
        for row in reader.deserialize::<RawSalesRow>() {
            rows.push(row?);
        }

        info!(rows = rows.len(), path = %path.display(), "loaded raw sales");
        Ok(rows)
    }

    /// Read a weekly aggregate file written by [`crate::export::weekly_frame`].
    ///
    /// `roll_mean_<w>` and `roll_std_<w>` columns are picked up for whatever
    /// windows are present.
    pub fn weekly_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<WeeklyAggregate>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::MissingInput(format!(
                "weekly aggregate {} not found",
                path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(File::open(path)?);
        let headers = reader.headers()?.clone();

        let column = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                ForecastError::DataError(format!(
                    "{} is missing required column '{}'",
                    path.display(),
                    name
                ))
            })
        };
        let product_idx = column("Product")?;
        let region_idx = column("Region")?;
        let week_idx = column("WeekStartDate")?;
        let sales_idx = column("Weekly_Sales")?;
        let stock_idx = headers.iter().position(|h| h == "Stock_Level");
        let days_idx = headers.iter().position(|h| h == "Days_Observed");

        let mut mean_columns: BTreeMap<usize, usize> = BTreeMap::new();
        let mut std_columns: BTreeMap<usize, usize> = BTreeMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(w) = header.strip_prefix("roll_mean_").and_then(|w| w.parse().ok()) {
                mean_columns.insert(w, idx);
            } else if let Some(w) = header.strip_prefix("roll_std_").and_then(|w| w.parse().ok()) {
                std_columns.insert(w, idx);
            }
        }

        let mut weekly = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let field = |idx: usize| record.get(idx).unwrap_or("");
            // NaN and infinities count as missing
            let optional_number = |idx: usize| {
                field(idx)
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
            };

            let week_start = parse_date(field(week_idx)).ok_or_else(|| {
                ForecastError::DataError(format!(
                    "{}: unparseable WeekStartDate '{}' on data line {}",
                    path.display(),
                    field(week_idx),
                    line + 1
                ))
            })?;
            let weekly_sales = optional_number(sales_idx).filter(|v| *v >= 0.0).ok_or_else(|| {
                ForecastError::DataError(format!(
                    "{}: Weekly_Sales '{}' on data line {} is not a non-negative number",
                    path.display(),
                    field(sales_idx),
                    line + 1
                ))
            })?;

            let mut rolling = BTreeMap::new();
            for w in mean_columns.keys().chain(std_columns.keys()) {
                rolling.entry(*w).or_insert_with(|| RollingStats {
                    mean: mean_columns.get(w).and_then(|&idx| optional_number(idx)),
                    std: std_columns.get(w).and_then(|&idx| optional_number(idx)),
                });
            }

            weekly.push(WeeklyAggregate {
                cohort: Cohort::new(field(product_idx), field(region_idx)),
                week_start,
                weekly_sales,
                stock_level: stock_idx.and_then(optional_number),
                rolling,
                days_observed: days_idx
                    .and_then(|idx| field(idx).parse().ok())
                    .unwrap_or(0),
            });
        }

        debug!(rows = weekly.len(), path = %path.display(), "loaded weekly aggregate");
        Ok(weekly)
    }
}
