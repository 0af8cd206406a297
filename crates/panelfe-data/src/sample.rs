//! Estimation samples.
//!
//! A [`PanelSample`] is the complete-case slice of a panel for one regression:
//! the dependent variable, the regressors (treatment first, then controls) and
//! dense entity/time indices for every retained row.

use crate::error::{DataError, Result};
use std::collections::BTreeMap;

/// Complete-case regression sample with dense fixed-effect indices.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSample {
    dependent: String,
    regressors: Vec<String>,
    entity_index: Vec<usize>,
    time_index: Vec<usize>,
    entity_levels: Vec<String>,
    time_levels: Vec<i64>,
    y: Vec<f64>,
    x: Vec<Vec<f64>>,
}

impl PanelSample {
    /// Build a sample from row-aligned observations.
    ///
    /// `columns` holds one vector per regressor, each as long as `y`. Entity and
    /// time levels are indexed in sorted order, so the indices do not depend on
    /// the order of the input rows.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::LengthMismatch`] if any input disagrees with `y` in
    /// length and [`DataError::MissingData`] if the sample is empty.
    pub fn new<S: AsRef<str>>(
        dependent: impl Into<String>,
        regressors: Vec<String>,
        entities: &[S],
        times: &[i64],
        y: Vec<f64>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let dependent = dependent.into();
        let n = y.len();
        if n == 0 {
            return Err(DataError::missing(
                dependent,
                "no complete observations in sample",
            ));
        }

        let check = |column: &str, actual: usize| {
            if actual == n {
                Ok(())
            } else {
                Err(DataError::LengthMismatch {
                    column: column.to_string(),
                    expected: n,
                    actual,
                })
            }
        };
        check("entity", entities.len())?;
        check("time", times.len())?;
        if regressors.len() != columns.len() {
            return Err(DataError::LengthMismatch {
                column: "regressors".to_string(),
                expected: regressors.len(),
                actual: columns.len(),
            });
        }
        for (name, column) in regressors.iter().zip(&columns) {
            check(name, column.len())?;
        }

        let entity_lookup: BTreeMap<&str, usize> = entities
            .iter()
            .map(AsRef::as_ref)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(i, e)| (e, i))
            .collect();
        let time_lookup: BTreeMap<i64, usize> = times
            .iter()
            .copied()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t, i))
            .collect();

        let entity_index = entities.iter().map(|e| entity_lookup[e.as_ref()]).collect();
        let time_index = times.iter().map(|t| time_lookup[t]).collect();
        let entity_levels = entity_lookup.keys().map(|e| (*e).to_string()).collect();
        let time_levels = time_lookup.keys().copied().collect();

        Ok(Self {
            dependent,
            regressors,
            entity_index,
            time_index,
            entity_levels,
            time_levels,
            y,
            x: columns,
        })
    }

    /// Name of the dependent variable.
    pub fn dependent(&self) -> &str {
        &self.dependent
    }

    /// Regressor names, treatment first.
    pub fn regressors(&self) -> &[String] {
        &self.regressors
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Whether the sample has no observations.
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Number of distinct entities.
    pub fn n_entities(&self) -> usize {
        self.entity_levels.len()
    }

    /// Number of distinct time periods.
    pub fn n_periods(&self) -> usize {
        self.time_levels.len()
    }

    /// Dense entity index per row.
    pub fn entity_index(&self) -> &[usize] {
        &self.entity_index
    }

    /// Dense time index per row.
    pub fn time_index(&self) -> &[usize] {
        &self.time_index
    }

    /// Entity identifiers, indexed by the dense entity index.
    pub fn entity_levels(&self) -> &[String] {
        &self.entity_levels
    }

    /// Time identifiers, indexed by the dense time index.
    pub fn time_levels(&self) -> &[i64] {
        &self.time_levels
    }

    /// Dependent variable.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Regressor columns, one vector per regressor.
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.x
    }

    /// Whether every (entity, time) cell is observed exactly once.
    pub fn is_balanced(&self) -> bool {
        self.len() == self.n_entities() * self.n_periods()
    }
}
