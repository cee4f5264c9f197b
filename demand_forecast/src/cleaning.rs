//! Per-cohort cleaning of raw sales rows
//!
//! Invalid rows are dropped, quantities and stock levels are clamped at zero,
//! and each cohort is filtered with Tukey fences on its own quantity
//! distribution. Quantiles use linear interpolation (see
//! [`demand_math::quantile`]).

use crate::data::{cohort_spans, Cohort, RawSalesRow, SalesRecord};
use crate::error::{ForecastError, Result};
use demand_math::iqr_fences;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Cohorts with fewer rows than this keep every row
pub const MIN_ROWS_FOR_OUTLIER_FILTER: usize = 4;

/// Cleaning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Width of the fences in interquartile ranges
    pub iqr_multiplier: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            iqr_multiplier: 1.5,
        }
    }
}

impl CleaningConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.iqr_multiplier > 0.0 && self.iqr_multiplier.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "iqr_multiplier must be positive, got {}",
                self.iqr_multiplier
            )));
        }
        Ok(())
    }
}

/// A cleaned sales row with its position inside the cohort
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    /// 0-based position in the cohort's date-sorted sequence
    pub seq: usize,
    pub sale: SalesRecord,
}

impl CleanRecord {
    pub fn cohort(&self) -> &Cohort {
        &self.sale.cohort
    }
}

/// Row counts collected while cleaning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub invalid_rows: usize,
    pub outlier_rows: usize,
    pub cohorts: usize,
}

impl CleaningReport {
    pub fn rows_kept(&self) -> usize {
        self.rows_in - self.invalid_rows - self.outlier_rows
    }
}

/// Output of the cleaner: rows ordered by (product, region, date)
#[derive(Debug, Clone)]
pub struct CleanedSales {
    pub records: Vec<CleanRecord>,
    pub report: CleaningReport,
}

/// Drops invalid rows and per-cohort quantity outliers
#[derive(Debug, Clone, Default)]
pub struct CohortCleaner {
    config: CleaningConfig,
}

impl CohortCleaner {
    pub fn new(config: CleaningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Clean rows straight from a sales file
    pub fn clean(&self, rows: &[RawSalesRow]) -> Result<CleanedSales> {
        let records: Vec<SalesRecord> = rows.iter().filter_map(SalesRecord::from_raw).collect();
        let invalid_rows = rows.len() - records.len();
        if invalid_rows > 0 {
            debug!(invalid_rows, "dropped rows with missing or unparseable fields");
        }

        let mut cleaned = self.clean_records(records)?;
        cleaned.report.rows_in += invalid_rows;
        cleaned.report.invalid_rows = invalid_rows;
        Ok(cleaned)
    }

    /// Clean rows that already passed validation
    pub fn clean_records(&self, mut records: Vec<SalesRecord>) -> Result<CleanedSales> {
        let rows_in = records.len();

        for record in &mut records {
            record.quantity_sold = record.quantity_sold.max(0.0);
            record.stock_level = record.stock_level.map(|s| s.max(0.0));
        }

        // Stable: rows sharing a date keep their input order
        records.sort_by(|a, b| a.cohort.cmp(&b.cohort).then(a.date.cmp(&b.date)));

        let spans = cohort_spans(&records, |r| &r.cohort);
        let mut kept = Vec::with_capacity(records.len());
        let mut outlier_rows = 0;

        for span in &spans {
            let group = &records[span.clone()];
            let before = kept.len();
            self.filter_cohort(group, &mut kept)?;

            let dropped = group.len() - (kept.len() - before);
            if dropped > 0 {
                debug!(cohort = %group[0].cohort, dropped, "removed quantity outliers");
            }
            outlier_rows += dropped;
        }

        let report = CleaningReport {
            rows_in,
            invalid_rows: 0,
            outlier_rows,
            cohorts: spans.len(),
        };
        info!(
            rows_in = report.rows_in,
            outliers = report.outlier_rows,
            cohorts = report.cohorts,
            "cleaned sales"
        );

        Ok(CleanedSales {
            records: kept,
            report,
        })
    }

    fn filter_cohort(&self, group: &[SalesRecord], kept: &mut Vec<CleanRecord>) -> Result<()> {
        let keep_all = group.len() < MIN_ROWS_FOR_OUTLIER_FILTER;
        let fences = if keep_all {
            None
        } else {
            let quantities: Vec<f64> = group.iter().map(|r| r.quantity_sold).collect();
            Some(iqr_fences(&quantities, self.config.iqr_multiplier)?)
        };

        let survivors = group
            .iter()
            .filter(|r| fences.map_or(true, |f| f.contains(r.quantity_sold)));
        for (seq, sale) in survivors.enumerate() {
            kept.push(CleanRecord {
                seq,
                sale: sale.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sale(cohort: &Cohort, d: u32, qty: f64) -> SalesRecord {
        SalesRecord::new(day(d), cohort.clone(), qty, Some(100.0))
    }

    #[test]
    fn test_outlier_is_removed_and_seq_is_dense() {
        let cohort = Cohort::new("P1", "North");
        let quantities = [10.0, 11.0, 12.0, 10.0, 11.0, 13.0, 12.0, 11.0, 10.0, 95.0];
        let records = quantities
            .iter()
            .enumerate()
            .map(|(i, &q)| sale(&cohort, i as u32 + 1, q))
            .collect();

        let cleaned = CohortCleaner::default().clean_records(records).unwrap();

        assert_eq!(cleaned.records.len(), 9);
        assert_eq!(cleaned.report.outlier_rows, 1);
        assert!(cleaned.records.iter().all(|r| r.sale.quantity_sold < 95.0));
        let seqs: Vec<usize> = cleaned.records.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_small_cohort_keeps_everything() {
        let cohort = Cohort::new("P2", "South");
        let records = vec![sale(&cohort, 1, 1.0), sale(&cohort, 2, 500.0), sale(&cohort, 3, 2.0)];

        let cleaned = CohortCleaner::default().clean_records(records).unwrap();
        assert_eq!(cleaned.records.len(), 3);
    }

    #[test]
    fn test_negative_values_are_clamped() {
        let cohort = Cohort::new("P3", "East");
        let mut record = sale(&cohort, 1, -4.0);
        record.stock_level = Some(-10.0);

        let cleaned = CohortCleaner::default().clean_records(vec![record]).unwrap();
        assert_eq!(cleaned.records[0].sale.quantity_sold, 0.0);
        assert_eq!(cleaned.records[0].sale.stock_level, Some(0.0));
    }

    #[test]
    fn test_rows_are_sorted_by_cohort_then_date() {
        let a = Cohort::new("A", "West");
        let b = Cohort::new("B", "East");
        let records = vec![sale(&b, 2, 1.0), sale(&a, 3, 1.0), sale(&b, 1, 1.0), sale(&a, 1, 1.0)];

        let cleaned = CohortCleaner::default().clean_records(records).unwrap();
        let order: Vec<(String, u32)> = cleaned
            .records
            .iter()
            .map(|r| (r.sale.cohort.product.clone(), chrono::Datelike::day(&r.sale.date)))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A".to_string(), 1),
                ("A".to_string(), 3),
                ("B".to_string(), 1),
                ("B".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_invalid_raw_rows_are_counted() {
        let rows = vec![
            RawSalesRow {
                date: Some("2024-01-01".into()),
                product: Some("P1".into()),
                region: Some("North".into()),
                quantity_sold: Some(5.0),
                stock_level: None,
            },
            RawSalesRow {
                date: None,
                product: Some("P1".into()),
                region: Some("North".into()),
                quantity_sold: Some(5.0),
                stock_level: None,
            },
        ];

        let cleaned = CohortCleaner::default().clean(&rows).unwrap();
        assert_eq!(cleaned.report.rows_in, 2);
        assert_eq!(cleaned.report.invalid_rows, 1);
        assert_eq!(cleaned.report.rows_kept(), 1);
    }

    #[test]
    fn test_rejects_non_positive_multiplier() {
        assert!(CohortCleaner::new(CleaningConfig { iqr_multiplier: 0.0 }).is_err());
    }
}
