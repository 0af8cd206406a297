//! Descriptive statistics of a prepared panel.
//!
//! Produces the tables that accompany a run: per-variable distribution
//! summaries, and variable means by time period and by group label.

use panelfe_data::quantile::{mean, quantile_sorted, sorted_finite, std_dev};
use panelfe_data::{DataError, GroupLabel, PanelTable, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Distribution summary of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptive {
    /// Column name
    pub variable: String,
    /// Non-missing values
    pub count: usize,
    /// Mean
    pub mean: Option<f64>,
    /// Sample standard deviation
    pub std: Option<f64>,
    /// Minimum
    pub min: Option<f64>,
    /// First quartile
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    /// Median
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    /// Third quartile
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    /// Maximum
    pub max: Option<f64>,
}

impl Descriptive {
    /// Summarize a column, ignoring missing values.
    pub fn of(variable: impl Into<String>, values: &[Option<f64>]) -> Self {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let sorted = sorted_finite(&present);
        Self {
            variable: variable.into(),
            count: sorted.len(),
            mean: mean(sorted.iter().copied().map(Some)),
            std: std_dev(&sorted),
            min: sorted.first().copied(),
            p25: quantile_sorted(&sorted, 0.25),
            p50: quantile_sorted(&sorted, 0.5),
            p75: quantile_sorted(&sorted, 0.75),
            max: sorted.last().copied(),
        }
    }
}

/// Descriptive statistics for each named column.
///
/// # Errors
///
/// Returns [`panelfe_data::DataError::MissingData`] if a column is absent.
pub fn describe(panel: &PanelTable, columns: &[&str]) -> Result<Vec<Descriptive>> {
    columns
        .iter()
        .map(|name| Ok(Descriptive::of(*name, &panel.numeric(name)?)))
        .collect()
}

/// Means of `columns` per time period, ordered by time.
pub fn mean_by_time(panel: &PanelTable, columns: &[&str]) -> Result<DataFrame> {
    let time = panel.time_column();
    Ok(panel
        .frame()
        .clone()
        .lazy()
        .group_by([col(time).cast(DataType::Int64)])
        .agg(column_means(panel, columns)?)
        .sort([time], SortMultipleOptions::default())
        .collect()?)
}

/// Means of `columns` per group label, ordered low, middle, high.
///
/// Rows without a label are left out. Labels other than the three tercile
/// names sort after them, alphabetically.
pub fn mean_by_group(
    panel: &PanelTable,
    group_column: &str,
    columns: &[&str],
) -> Result<DataFrame> {
    if !panel.has_column(group_column) {
        return Err(DataError::missing(group_column, "column not found in panel"));
    }
    let label = col(group_column).cast(DataType::String);

    let labels = GroupLabel::all();
    let rank = labels.iter().enumerate().rev().fold(
        lit(labels.len() as u32),
        |rest, (position, group)| {
            when(col(group_column).eq(lit(group.name())))
                .then(lit(position as u32))
                .otherwise(rest)
        },
    );

    Ok(panel
        .frame()
        .clone()
        .lazy()
        .filter(label.clone().is_not_null())
        .group_by([label])
        .agg(column_means(panel, columns)?)
        .sort_by_exprs([rank, col(group_column)], SortMultipleOptions::default())
        .collect()?)
}

/// Mean of each column over its finite values.
fn column_means(panel: &PanelTable, columns: &[&str]) -> Result<Vec<Expr>> {
    columns
        .iter()
        .map(|&name| {
            if !panel.has_column(name) {
                return Err(DataError::missing(name, "column not found in panel"));
            }
            let value = col(name).cast(DataType::Float64);
            Ok(value.clone().filter(value.is_finite()).mean().alias(name))
        })
        .collect()
}
