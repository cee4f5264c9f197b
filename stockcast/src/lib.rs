//! # Stockcast
//!
//! Stage sequencing for the demand planning workflow:
//!
//! 1. **preprocess** - load raw sales, clean, derive features, aggregate weekly
//! 2. **forecast** - per-cohort weekly forecasts and back-fit metrics
//! 3. **optimize** - per-cohort reorder plan and dashboard
//!
//! Every stage writes its artifacts into one output directory. The forecast
//! and optimize stages can also start from the weekly aggregate a previous
//! preprocess run left there.

use std::fmt;
use thiserror::Error;

pub mod config;
pub mod pipeline;

pub use config::{ConfigOverrides, PipelineConfig};
pub use pipeline::{Pipeline, RunSummary};

/// Pipeline stage, used to name where a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Forecast,
    Optimize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preprocess => "preprocess",
            Stage::Forecast => "forecast",
            Stage::Optimize => "optimize",
        };
        f.write_str(name)
    }
}

/// Errors that end a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{stage} stage cannot start: {precondition}")]
    MissingArtifact { stage: Stage, precondition: String },

    #[error(transparent)]
    Forecast(#[from] demand_forecast::ForecastError),

    #[error(transparent)]
    Plan(#[from] inventory_plan::PlanError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
