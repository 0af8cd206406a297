//! JSON report of a run.

use crate::table::{FailureRow, SummaryRow, SummaryTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a run produced, in run order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Name of the run.
    pub name: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Configuration the run used.
    pub config: serde_json::Value,

    /// Successful regressions.
    pub results: Vec<SummaryRow>,

    /// Failed configurations.
    pub failures: Vec<FailureRow>,
}

impl Report {
    /// Create a new report stamped with the current time.
    pub fn new(name: String, config: serde_json::Value, table: SummaryTable) -> Self {
        Self {
            name,
            timestamp: Utc::now(),
            config,
            results: table.rows,
            failures: table.failures,
        }
    }

    /// Results and failures as a summary table.
    pub fn table(&self) -> SummaryTable {
        SummaryTable::new(self.results.clone(), self.failures.clone())
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    name: Option<String>,
    config: Option<serde_json::Value>,
    table: SummaryTable,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the run name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Record the configuration.
    pub fn config<T: Serialize>(mut self, config: &T) -> Result<Self, ReportError> {
        self.config = Some(serde_json::to_value(config)?);
        Ok(self)
    }

    /// Set results and failures.
    pub fn table(mut self, table: SummaryTable) -> Self {
        self.table = table;
        self
    }

    /// Build the report.
    pub fn build(self) -> Report {
        Report::new(
            self.name.unwrap_or_else(|| "panelfe".to_string()),
            self.config.unwrap_or(serde_json::Value::Null),
            self.table,
        )
    }
}
