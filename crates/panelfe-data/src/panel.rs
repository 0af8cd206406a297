//! Panel table backed by a polars `DataFrame`.
//!
//! Rows are indexed by `(entity, time)`. On construction rows with a missing
//! entity or time are dropped, the remaining rows are sorted by entity and
//! then time, and duplicate keys are rejected. Derived columns are attached
//! with the `with_*` methods, which return a new table.

use crate::error::{DataError, Result};
use crate::sample::PanelSample;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Panel of observations keyed by `(entity, time)`.
#[derive(Debug, Clone)]
pub struct PanelTable {
    frame: DataFrame,
    entity_column: String,
    time_column: String,
    entities: Vec<String>,
    times: Vec<i64>,
}

impl PanelTable {
    /// Build a panel from a loaded `DataFrame`.
    ///
    /// The entity column may be of any type castable to a string; the time
    /// column must be castable to `Int64` (integers, years, dates).
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingData`] if either key column is absent and
    /// [`DataError::DuplicateObservation`] if a key appears twice.
    pub fn new(frame: DataFrame, entity_column: &str, time_column: &str) -> Result<Self> {
        for name in [entity_column, time_column] {
            if frame.get_column_index(name).is_none() {
                return Err(DataError::missing(name, "key column not found"));
            }
        }
        let entity_key = col(entity_column).cast(DataType::String);
        let time_key = col(time_column).cast(DataType::Int64);

        let height = frame.height();
        let frame = frame
            .lazy()
            .filter(entity_key.clone().is_not_null().and(time_key.clone().is_not_null()))
            .sort_by_exprs([entity_key, time_key], SortMultipleOptions::default())
            .collect()?;
        let dropped = height - frame.height();

        let entities: Vec<String> = key_column(&frame, entity_column, &DataType::String)?
            .str()?
            .into_iter()
            .map(|e| e.unwrap_or_default().to_string())
            .collect();
        let times: Vec<i64> = key_column(&frame, time_column, &DataType::Int64)?
            .i64()?
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();

        if let Some(row) = (1..times.len())
            .find(|&i| entities[i] == entities[i - 1] && times[i] == times[i - 1])
        {
            return Err(DataError::DuplicateObservation {
                entity: entities[row].clone(),
                time: times[row],
            });
        }

        if dropped > 0 {
            tracing::warn!(dropped, "dropped rows with a missing entity or time key");
        }

        Ok(Self {
            frame,
            entity_column: entity_column.to_string(),
            time_column: time_column.to_string(),
            entities,
            times,
        })
    }

    /// Underlying frame, sorted by entity and time.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Consume the table, returning the underlying frame.
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Name of the entity key column.
    pub fn entity_column(&self) -> &str {
        &self.entity_column
    }

    /// Name of the time key column.
    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    /// Entity identifier of each row.
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    /// Time identifier of each row.
    pub fn times(&self) -> &[i64] {
        &self.times
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Number of distinct entities.
    pub fn n_entities(&self) -> usize {
        self.entities.iter().collect::<BTreeSet<_>>().len()
    }

    /// Number of distinct time periods.
    pub fn n_periods(&self) -> usize {
        self.times.iter().collect::<BTreeSet<_>>().len()
    }

    /// Whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    /// Numeric column as optional values; nulls and non-finite values are `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingData`] if the column does not exist.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| DataError::missing(name, "column not found in panel"))?
            .cast(&DataType::Float64)?;

        Ok(column
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect())
    }

    /// Categorical column as optional strings.
    pub fn labels(&self, name: &str) -> Result<Vec<Option<String>>> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| DataError::missing(name, "column not found in panel"))?
            .cast(&DataType::String)?;

        Ok(column
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    /// Attach (or replace) a numeric column.
    pub fn with_numeric(&self, name: &str, values: Vec<Option<f64>>) -> Result<Self> {
        self.check_length(name, values.len())?;
        let mut frame = self.frame.clone();
        frame.with_column(Column::new(name.into(), values))?;
        Ok(self.replace_frame(frame))
    }

    /// Attach (or replace) a string column.
    pub fn with_labels(&self, name: &str, values: Vec<Option<String>>) -> Result<Self> {
        self.check_length(name, values.len())?;
        let mut frame = self.frame.clone();
        frame.with_column(Column::new(name.into(), values))?;
        Ok(self.replace_frame(frame))
    }

    /// Entity-wise first difference of a column.
    ///
    /// The first observation of each entity, and any row whose own or
    /// preceding value is missing, yields `None`.
    pub fn first_difference(&self, name: &str) -> Result<Vec<Option<f64>>> {
        self.require_column(name)?;
        let value = col(name).cast(DataType::Float64);
        let diff = self
            .frame
            .clone()
            .lazy()
            .select([(value.clone()
                - value.shift(lit(1)).over([col(self.entity_column.as_str())]))
            .alias(name)])
            .collect()?;

        Ok(diff
            .column(name)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect())
    }

    /// Number of rows of each row's entity.
    pub fn entity_observation_counts(&self) -> Result<Vec<usize>> {
        let counts = self
            .frame
            .clone()
            .lazy()
            .select([col(self.time_column.as_str())
                .count()
                .over([col(self.entity_column.as_str())])
                .cast(DataType::UInt64)
                .alias("count")])
            .collect()?;

        Ok(counts
            .column("count")?
            .u64()?
            .into_iter()
            .map(|c| c.unwrap_or_default() as usize)
            .collect())
    }

    /// Keep the rows where `mask` is true.
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Self> {
        self.check_length("mask", mask.len())?;
        let keep = BooleanChunked::from_slice("mask".into(), mask);
        let frame = self.frame.filter(&keep)?;

        let pick = |i: &usize| mask[*i];
        let entities = (0..mask.len())
            .filter(pick)
            .map(|i| self.entities[i].clone())
            .collect();
        let times = (0..mask.len()).filter(pick).map(|i| self.times[i]).collect();

        Ok(Self {
            frame,
            entity_column: self.entity_column.clone(),
            time_column: self.time_column.clone(),
            entities,
            times,
        })
    }

    /// Keep the rows of entities matching a predicate.
    pub fn filter_entities<F>(&self, keep: F) -> Result<Self>
    where
        F: Fn(&str) -> bool,
    {
        let mask: Vec<bool> = self.entities.iter().map(|e| keep(e)).collect();
        self.filter_rows(&mask)
    }

    /// Complete-case sample for a regression of `dependent` on `regressors`.
    ///
    /// Rows with any missing required value are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingData`] if a column is absent or no complete
    /// row remains.
    pub fn sample(&self, dependent: &str, regressors: &[String]) -> Result<PanelSample> {
        let y = self.numeric(dependent)?;
        let xs = regressors
            .iter()
            .map(|name| self.numeric(name))
            .collect::<Result<Vec<_>>>()?;

        let complete: Vec<usize> = (0..self.height())
            .filter(|&i| y[i].is_some() && xs.iter().all(|x| x[i].is_some()))
            .collect();

        if complete.is_empty() {
            return Err(DataError::missing(
                dependent,
                "no complete observations after dropping missing values",
            ));
        }

        let entities: Vec<&str> = complete.iter().map(|&i| self.entities[i].as_str()).collect();
        let times: Vec<i64> = complete.iter().map(|&i| self.times[i]).collect();
        let y_obs = complete.iter().filter_map(|&i| y[i]).collect();
        let columns = xs
            .iter()
            .map(|x| complete.iter().filter_map(|&i| x[i]).collect())
            .collect();

        tracing::debug!(
            dependent,
            rows = self.height(),
            complete = complete.len(),
            "extracted regression sample"
        );

        PanelSample::new(
            dependent,
            regressors.to_vec(),
            &entities,
            &times,
            y_obs,
            columns,
        )
    }

    fn require_column(&self, name: &str) -> Result<()> {
        if !self.has_column(name) {
            return Err(DataError::missing(name, "column not found in panel"));
        }
        Ok(())
    }

    fn check_length(&self, column: &str, actual: usize) -> Result<()> {
        if actual != self.height() {
            return Err(DataError::LengthMismatch {
                column: column.to_string(),
                expected: self.height(),
                actual,
            });
        }
        Ok(())
    }

    fn replace_frame(&self, frame: DataFrame) -> Self {
        Self {
            frame,
            entity_column: self.entity_column.clone(),
            time_column: self.time_column.clone(),
            entities: self.entities.clone(),
            times: self.times.clone(),
        }
    }
}

fn key_column(frame: &DataFrame, name: &str, dtype: &DataType) -> Result<Column> {
    let column = frame
        .column(name)
        .map_err(|_| DataError::missing(name, "key column not found"))?;
    Ok(column.cast(dtype)?)
}
