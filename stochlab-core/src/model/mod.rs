//! Regression models used to extrapolate closing prices from the oscillator.
//!
//! The `Regressor` trait follows a fit-predict pattern over row-major feature
//! matrices. The only implementation is a histogram-based gradient boosting
//! regressor that accepts NaN features (oscillator warm-up rows).

pub mod binning;
pub mod boosting;
pub mod tree;

pub use boosting::{BoostingParams, HistGradientBoostingRegressor};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("model has not been fitted")]
    NotFitted,
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Supervised regressor over row-major features.
pub trait Regressor {
    /// Fit the model to feature rows `x` and targets `y`.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// Predict one value per feature row.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    fn is_fitted(&self) -> bool;
}
