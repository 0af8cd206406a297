//! CSV loading and writing for panel frames.

use crate::error::{DataError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Read a CSV file with a header row into a `DataFrame`.
///
/// # Errors
///
/// Returns [`DataError::Io`] if the file does not exist and
/// [`DataError::Polars`] if it cannot be parsed.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(DataError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    tracing::info!(
        path = %path.display(),
        rows = frame.height(),
        columns = frame.width(),
        "loaded panel data"
    );
    Ok(frame)
}

/// Write a `DataFrame` to a CSV file with a header row.
pub fn write_csv(frame: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(frame)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let dir = std::env::temp_dir().join(format!("panelfe-io-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("panel.csv");

        let mut df = DataFrame::new(vec![
            Column::new("city".into(), ["a", "b"]),
            Column::new("year".into(), [2013i64, 2014]),
            Column::new("y".into(), [1.5, 2.5]),
        ])
        .unwrap();
        write_csv(&mut df, &path).unwrap();

        let loaded = read_csv(&path).unwrap();
        assert_eq!(loaded.height(), 2);
        assert_eq!(loaded.width(), 3);
        assert!(loaded.get_column_index("y").is_some());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file() {
        let err = read_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, DataError::Io(_)));
    }
}
