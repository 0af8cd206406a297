//! Error types for a run.

use panelfe_data::DataError;
use panelfe_output::{ExportError, ReportError};
use thiserror::Error;

/// Result type for runs.
pub type Result<T> = std::result::Result<T, RunError>;

/// Errors that abort a run.
///
/// Failures of individual regressions are not errors at this level; they are
/// recorded in the run report.
#[derive(Debug, Error)]
pub enum RunError {
    /// Loading or preprocessing the panel failed
    #[error(transparent)]
    Data(#[from] DataError),

    /// Writing an artifact failed
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Building the report failed
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Polars error while assembling a table
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration is inconsistent
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
