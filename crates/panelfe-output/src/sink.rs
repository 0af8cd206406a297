//! Destinations for run artifacts.
//!
//! Callers pass a sink explicitly; nothing in the library writes to a fixed
//! location.

use crate::export::ExportError;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Receives named text artifacts.
pub trait OutputSink {
    /// Store `contents` under `name`, replacing anything already there.
    fn write_text(&mut self, name: &str, contents: &str) -> Result<(), ExportError>;

    /// Store a frame as CSV with a header row.
    fn write_frame(&mut self, name: &str, frame: &mut DataFrame) -> Result<(), ExportError> {
        let mut buffer = Vec::new();
        CsvWriter::new(&mut buffer).include_header(true).finish(frame)?;
        let text = String::from_utf8(buffer).map_err(|e| ExportError::InvalidFormat(e.to_string()))?;
        self.write_text(name, &text)
    }
}

/// Writes artifacts as files under a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Create a sink rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the sink writes into.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputSink for DirectorySink {
    fn write_text(&mut self, name: &str, contents: &str) -> Result<(), ExportError> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(name);
        fs::write(&path, contents)?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote artifact");
        Ok(())
    }
}

/// Keeps artifacts in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: BTreeMap<String, String>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// Names of the stored artifacts, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }
}

impl OutputSink for MemorySink {
    fn write_text(&mut self, name: &str, contents: &str) -> Result<(), ExportError> {
        self.files.insert(name.to_string(), contents.to_string());
        Ok(())
    }
}
