//! Error types for panel data operations.

use thiserror::Error;

/// Result type for panel data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while building or preprocessing a panel.
#[derive(Debug, Error)]
pub enum DataError {
    /// Quantile bounds outside [0, 1] or not strictly ordered
    #[error("Invalid quantile bounds: lower {lower}, upper {upper} (need 0 <= lower < upper <= 1)")]
    InvalidQuantile {
        /// Lower quantile fraction
        lower: f64,
        /// Upper quantile fraction
        upper: f64,
    },

    /// No entity carries a usable summary statistic
    #[error("Cannot assign groups: the entity set is empty")]
    EmptyGroup,

    /// Required column absent, or nothing left after dropping incomplete rows
    #[error("Missing data in column {column}: {reason}")]
    MissingData {
        /// Column that was requested
        column: String,
        /// Reason the data is unusable
        reason: String,
    },

    /// Two rows share the same (entity, time) key
    #[error("Duplicate observation for entity {entity} at time {time}")]
    DuplicateObservation {
        /// Entity identifier
        entity: String,
        /// Time identifier
        time: i64,
    },

    /// Column length does not match the panel height
    #[error("Column {column} has {actual} rows, panel has {expected}")]
    LengthMismatch {
        /// Column being attached
        column: String,
        /// Panel height
        expected: usize,
        /// Column length
        actual: usize,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Shorthand for a [`DataError::MissingData`] error.
    pub fn missing(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MissingData {
            column: column.into(),
            reason: reason.into(),
        }
    }
}
