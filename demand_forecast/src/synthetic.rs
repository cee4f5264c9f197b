//! Seeded synthetic sales history for demos and tests

use crate::data::RawSalesRow;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

const REGION_NAMES: [&str; 5] = ["North", "South", "East", "West", "Central"];

/// Generator for daily sales of every (product, region) pair
#[derive(Debug, Clone)]
pub struct SyntheticSales {
    pub products: usize,
    pub regions: usize,
    pub days: usize,
    pub start: NaiveDate,
    pub seed: u64,
    /// Noise standard deviation as a fraction of the cohort's base level
    pub noise: f64,
    /// Chance that a day carries a demand spike
    pub spike_probability: f64,
    /// Chance that a day's quantity is left blank
    pub missing_probability: f64,
    /// Days between replenishments
    pub restock_every: usize,
}

impl Default for SyntheticSales {
    fn default() -> Self {
        Self {
            products: 5,
            regions: 3,
            days: 365,
            start: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or_default(),
            seed: 42,
            noise: 0.2,
            spike_probability: 0.01,
            missing_probability: 0.005,
            restock_every: 14,
        }
    }
}

impl SyntheticSales {
    fn region_name(i: usize) -> String {
        REGION_NAMES
            .get(i)
            .map(|r| r.to_string())
            .unwrap_or_else(|| format!("Region_{}", i + 1))
    }

    /// Generate rows ordered by product, region and date
    pub fn generate(&self) -> Result<Vec<RawSalesRow>> {
        for (name, p) in [
            ("spike_probability", self.spike_probability),
            ("missing_probability", self.missing_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be within [0, 1], got {}",
                    name, p
                )));
            }
        }
        if self.restock_every == 0 {
            return Err(ForecastError::InvalidParameter(
                "restock_every must be positive".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut rows = Vec::with_capacity(self.products * self.regions * self.days);

        for p in 0..self.products {
            let product = format!("P{:03}", p + 1);
            for r in 0..self.regions {
                let region = Self::region_name(r);
                let base: f64 = rng.gen_range(20.0..60.0);
                let trend: f64 = rng.gen_range(-0.01..0.03);
                let noise = Normal::new(0.0, base * self.noise)
                    .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;

                let restock = base * self.restock_every as f64;
                let mut stock = restock * 1.5;

                for day in 0..self.days {
                    let date = self.start + Duration::days(day as i64);
                    let weekday = date.weekday().num_days_from_monday();
                    let weekly = if weekday >= 5 { 1.3 } else { 1.0 };
                    let yearly = 1.0
                        + 0.2 * (2.0 * std::f64::consts::PI * date.ordinal() as f64 / 365.0).sin();

                    let mut quantity =
                        (base * (1.0 + trend * day as f64 / 30.0) * weekly * yearly
                            + noise.sample(&mut rng))
                        .max(0.0);
                    if rng.gen_bool(self.spike_probability) {
                        quantity *= rng.gen_range(3.0..6.0);
                    }
                    let quantity = quantity.round();

                    if day > 0 && day % self.restock_every == 0 {
                        stock += restock;
                    }
                    stock = (stock - quantity).max(0.0);

                    let quantity_sold =
                        (!rng.gen_bool(self.missing_probability)).then_some(quantity);

                    rows.push(RawSalesRow {
                        date: Some(date.format("%Y-%m-%d").to_string()),
                        product: Some(product.clone()),
                        region: Some(region.clone()),
                        quantity_sold,
                        stock_level: Some(stock.round()),
                    });
                }
            }
        }

        info!(
            rows = rows.len(),
            cohorts = self.products * self.regions,
            seed = self.seed,
            "generated synthetic sales"
        );
        Ok(rows)
    }

    /// Generate and write a sales CSV with the input column layout
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let rows = self.generate()?;
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataLoader;

    fn small() -> SyntheticSales {
        SyntheticSales {
            products: 2,
            regions: 2,
            days: 60,
            ..SyntheticSales::default()
        }
    }

    #[test]
    fn test_same_seed_same_rows() {
        let a = small().generate().unwrap();
        let b = small().generate().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2 * 2 * 60);

        let other = SyntheticSales {
            seed: 7,
            ..small()
        }
        .generate()
        .unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_values_are_non_negative() {
        let rows = small().generate().unwrap();
        assert!(rows
            .iter()
            .filter_map(|r| r.quantity_sold)
            .all(|q| q >= 0.0));
        assert!(rows.iter().filter_map(|r| r.stock_level).all(|s| s >= 0.0));
    }

    #[test]
    fn test_missing_quantities_are_injected() {
        let rows = SyntheticSales {
            missing_probability: 1.0,
            ..small()
        }
        .generate()
        .unwrap();
        assert!(rows.iter().all(|r| r.quantity_sold.is_none()));
    }

    #[test]
    fn test_written_csv_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");

        let written = small().write_csv(&path).unwrap();
        let loaded = DataLoader::from_csv(&path).unwrap();

        assert_eq!(loaded.len(), written);
    }

    #[test]
    fn test_rejects_bad_probability() {
        let generator = SyntheticSales {
            spike_probability: 1.5,
            ..small()
        };
        assert!(generator.generate().is_err());
    }
}
