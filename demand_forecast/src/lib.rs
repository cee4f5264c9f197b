//! # Demand Forecast
//!
//! A Rust library that turns daily sales history into weekly demand series
//! and per-cohort demand forecasts.
//!
//! ## Features
//!
//! - CSV loading of raw sales rows (`Date, Product, Region, Quantity_Sold, Stock_Level`)
//! - Per-cohort cleaning with IQR outlier fences
//! - Calendar, cyclical, lag and rolling-window features
//! - Weekly aggregation on Monday-start weeks
//! - Forecasting models (Holt linear trend, Exponential Smoothing, Moving Average)
//!   with prediction intervals
//! - Back-fit accuracy metrics (MAE, RMSE, MAPE)
//! - Export of every artifact through polars data frames
//!
//! A cohort is a (product, region) pair. Cohorts never interact: each one is
//! cleaned, featured, aggregated and forecast on its own, and a cohort whose
//! forecast fails is skipped without stopping the others.
//!
//! ## Quick Start
//!
//! ```no_run
//! use demand_forecast::adapter::{ForecastAdapter, ForecastConfig};
//! use demand_forecast::cleaning::CohortCleaner;
//! use demand_forecast::features::FeatureBuilder;
//! use demand_forecast::weekly::WeeklyAggregator;
//! use demand_forecast::DataLoader;
//!
//! # fn main() -> demand_forecast::Result<()> {
//! // Load and clean
//! let raw = DataLoader::from_csv("sales.csv")?;
//! let cleaned = CohortCleaner::default().clean(&raw)?;
//!
//! // Derive features and collapse into weeks
//! let featured = FeatureBuilder::default().build(&cleaned.records)?;
//! let weekly = WeeklyAggregator::aggregate(&featured);
//!
//! // Forecast 12 weeks ahead with Holt's method
//! let run = ForecastAdapter::new(ForecastConfig::default())?.run(&weekly)?;
//! for failure in &run.failures {
//!     println!("skipped {}", failure);
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod cleaning;
pub mod data;
pub mod error;
pub mod export;
pub mod features;
pub mod metrics;
pub mod models;
pub mod synthetic;
pub mod weekly;

// Re-export commonly used types
pub use crate::adapter::{ForecastAdapter, ForecastConfig, ForecastPoint, ForecastRun};
pub use crate::data::{Cohort, DataLoader, RawSalesRow, SalesRecord};
pub use crate::error::{ForecastError, Result};
pub use crate::metrics::CohortMetrics;
pub use crate::models::{ForecastModel, ForecastResult, Forecaster, ModelKind};
pub use crate::weekly::{CohortSeries, WeeklyAggregate, WeeklyAggregator};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
