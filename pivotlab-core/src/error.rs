//! Engine error taxonomy.
//!
//! A duplicate signal is deliberately absent: it is a normal outcome
//! (`Decision::NoActionTaken`), not a failure.

use thiserror::Error;

use crate::data::DataError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Input rejected before any computation ran.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required record (reference bar, prior event) does not exist.
    #[error("{what} not found for '{instrument}'")]
    NotFound { what: String, instrument: String },

    /// Trend window shorter than the estimator needs.
    #[error("insufficient data: need at least {needed} bars, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("market data error: {0}")]
    Data(#[from] DataError),
}

impl EngineError {
    pub fn not_found(what: impl Into<String>, instrument: impl Into<String>) -> Self {
        EngineError::NotFound {
            what: what.into(),
            instrument: instrument.into(),
        }
    }
}
