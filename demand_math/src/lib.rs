//! # Demand Math
//!
//! Numeric building blocks shared by the demand planning crates.
//! Everything here works on plain `f64` slices and knows nothing about
//! products, regions or calendars.

use thiserror::Error;

pub mod descriptive;
pub mod rolling;
pub mod smoothing;

pub use descriptive::{iqr_fences, mean, quantile, sample_std, Fences};
pub use rolling::{lagged, rolling_mean, rolling_std, RollingWindow};
pub use smoothing::{DoubleExponentialSmoothing, ExponentialSmoothing};

/// Errors that can occur in demand math calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for demand math operations
pub type Result<T> = std::result::Result<T, MathError>;
