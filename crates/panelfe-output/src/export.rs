//! CSV and JSON export of result rows.

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Polars error while rendering a frame.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output was not valid UTF-8.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Trait for types that can be exported to various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// Rows serialize to one CSV record each, with a header taken from the
/// field names. An empty slice exports as an empty string.
impl<T: Serialize> Exporter for [T] {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for record in self {
                    wtr.serialize(record)?;
                }
                let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
                String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// Write a CSV header line for `columns` followed by no records.
///
/// Used when a table has no rows but its schema should still be visible.
pub fn empty_csv(columns: &[&str]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(columns)?;
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        name: String,
        value: f64,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                name: "a".to_string(),
                value: 1.5,
            },
            Row {
                name: "b".to_string(),
                value: -2.0,
            },
        ]
    }

    #[test]
    fn test_csv_has_header() {
        let csv = rows().export_to_string(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("name,value"));
        assert_eq!(lines.next(), Some("a,1.5"));
        assert_eq!(lines.next(), Some("b,-2.0"));
    }

    #[test]
    fn test_json_formats() {
        let compact = rows().export_to_string(ExportFormat::Json).unwrap();
        assert!(compact.starts_with("[{\"name\":\"a\""));

        let pretty = rows().export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(pretty.contains('\n'));
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }

    #[test]
    fn test_empty_csv_header() {
        assert_eq!(empty_csv(&["sample", "kind"]).unwrap(), "sample,kind\n");
    }
}
