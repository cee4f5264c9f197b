//! # Inventory Plan
//!
//! `inventory_plan` turns a weekly demand aggregate into one reorder decision
//! per (product, region) cohort.
//!
//! For every cohort the engine computes average and variability of weekly
//! demand, the demand expected over the replenishment lead time, a safety
//! stock buffer and a reorder point. The latest stock reading is then
//! classified as `CRITICAL`, `LOW`, `OPTIMAL` or `EXCESS`, and an order
//! quantity is recommended for the first two.
//!
//! ## Usage Example
//!
//! ```no_run
//! use demand_forecast::DataLoader;
//! use inventory_plan::{InventoryPolicy, PolicyConfig};
//! use inventory_plan::report::StatusSummary;
//!
//! let weekly = DataLoader::weekly_from_csv("output/aggregated_weekly_sales.csv").unwrap();
//! let policy = InventoryPolicy::new(PolicyConfig::default()).unwrap();
//!
//! let plan = policy.plan(&weekly).unwrap();
//! println!("{}", StatusSummary::from_rows(&plan));
//! ```

use demand_forecast::{Cohort, ForecastError};
use thiserror::Error;

pub mod policy;
pub mod report;

pub use policy::{InventoryPlanRow, InventoryPolicy, PolicyConfig, StockStatus, StockoutRisk};

/// Errors that can occur while planning inventory
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Cohort {0} has no weekly history")]
    EmptyHistory(Cohort),

    #[error("Weekly aggregate is missing or empty; run preprocessing first")]
    MissingWeeklyAggregate,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Export error: {0}")]
    Export(#[from] ForecastError),

    #[error("Polars error: {0}")]
    PolarsError(String),
}

impl From<polars::prelude::PolarsError> for PlanError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        PlanError::PolarsError(err.to_string())
    }
}

/// Result type for inventory planning
pub type Result<T> = std::result::Result<T, PlanError>;
