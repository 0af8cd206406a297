//! Preprocessing shared by every regression of a run.
//!
//! Derived columns are computed once, before any estimation:
//!
//! - `d_<dep>`: entity-wise first difference of the dependent variable
//! - `<group_column>`: tercile label of the entity's mean treatment
//! - `<entity>_obs_count`: rows per entity
//!
//! A second copy of the panel carries the winsorized dependent and treatment
//! variables under their original names.

use crate::config::RunConfig;
use crate::error::Result;
use panelfe_data::{GroupAssignment, PanelTable, assign_groups, entity_means, winsorize};

/// Panel with every derived column attached.
#[derive(Debug, Clone)]
pub struct PreparedPanel {
    panel: PanelTable,
    winsorized: PanelTable,
    groups: GroupAssignment,
}

impl PreparedPanel {
    /// Attach derived columns and compute the group assignment.
    ///
    /// # Errors
    ///
    /// Any error here aborts the run: invalid quantile bounds, missing
    /// dependent or treatment columns, or an entity set with no treatment
    /// values to group on.
    pub fn prepare(panel: PanelTable, config: &RunConfig) -> Result<Self> {
        config.validate()?;

        let dependent = panel.numeric(&config.dependent)?;
        let treatment = panel.numeric(&config.treatment)?;
        for control in &config.controls {
            panel.numeric(control)?;
        }

        let delta = panel.first_difference(&config.dependent)?;

        let means = entity_means(
            panel
                .entities()
                .iter()
                .map(String::as_str)
                .zip(treatment.iter().copied()),
        );
        let groups = assign_groups(&means, &config.tercile)?;
        let labels = panel
            .entities()
            .iter()
            .map(|e| groups.label(e).map(|l| l.name().to_string()))
            .collect();

        let counts = panel
            .entity_observation_counts()?
            .into_iter()
            .map(|c| Some(c as f64))
            .collect();

        let panel = panel
            .with_numeric(&config.delta_column(), delta)?
            .with_labels(&config.group_column, labels)?
            .with_numeric(&config.count_column(), counts)?;

        let winsorized = panel
            .with_numeric(&config.dependent, winsorize(&dependent, &config.winsor)?)?
            .with_numeric(&config.treatment, winsorize(&treatment, &config.winsor)?)?;

        let (low, high) = groups.cutoffs();
        tracing::info!(
            rows = panel.height(),
            entities = panel.n_entities(),
            periods = panel.n_periods(),
            grouped = groups.len(),
            low_cutoff = low,
            high_cutoff = high,
            "prepared panel"
        );

        Ok(Self {
            panel,
            winsorized,
            groups,
        })
    }

    /// Panel with the derived columns.
    pub const fn panel(&self) -> &PanelTable {
        &self.panel
    }

    /// Panel with the dependent and treatment variables winsorized.
    pub const fn winsorized(&self) -> &PanelTable {
        &self.winsorized
    }

    /// Entity group assignment.
    pub const fn groups(&self) -> &GroupAssignment {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RunError;
    use approx::assert_relative_eq;
    use panelfe_data::{DataError, GroupLabel};
    use polars::prelude::*;

    fn table() -> PanelTable {
        let frame = DataFrame::new(vec![
            Column::new("city".into(), ["a", "a", "a", "b", "b", "c", "c", "c"]),
            Column::new("year".into(), [1i64, 2, 3, 1, 2, 1, 2, 3]),
            Column::new("y".into(), [1.0, 2.0, 4.0, 3.0, 3.5, 0.0, 1.0, 1.5]),
            Column::new(
                "x".into(),
                [Some(0.1), Some(0.2), Some(0.3), Some(1.0), Some(2.0), Some(5.0), None, Some(7.0)],
            ),
        ])
        .unwrap();
        PanelTable::new(frame, "city", "year").unwrap()
    }

    fn config() -> RunConfig {
        RunConfig::new("city", "year", "y", "x")
    }

    #[test]
    fn test_derived_columns() {
        let prepared = PreparedPanel::prepare(table(), &config()).unwrap();
        let panel = prepared.panel();

        let delta = panel.numeric("d_y").unwrap();
        assert_eq!(delta[0], None);
        assert_relative_eq!(delta[1].unwrap(), 1.0);
        assert_relative_eq!(delta[2].unwrap(), 2.0);
        assert_eq!(delta[3], None);

        let counts = panel.numeric("city_obs_count").unwrap();
        assert_eq!(counts[0], Some(3.0));
        assert_eq!(counts[3], Some(2.0));

        let labels = panel.labels("group").unwrap();
        assert_eq!(labels[0].as_deref(), Some("low"));
        assert_eq!(labels[7].as_deref(), Some("high"));
        assert_eq!(prepared.groups().label("b"), Some(GroupLabel::Middle));
    }

    #[test]
    fn test_winsorized_copy_keeps_names() {
        let prepared = PreparedPanel::prepare(table(), &config()).unwrap();
        let original = prepared.panel().numeric("y").unwrap();
        let clipped = prepared.winsorized().numeric("y").unwrap();
        assert_eq!(original.len(), clipped.len());
        // the raw column is untouched
        assert_eq!(original[2], Some(4.0));
        // missing treatment stays missing
        assert_eq!(prepared.winsorized().numeric("x").unwrap()[6], None);
    }

    #[test]
    fn test_missing_treatment_column_aborts() {
        let err = PreparedPanel::prepare(table(), &RunConfig::new("city", "year", "y", "z"))
            .unwrap_err();
        assert!(matches!(err, RunError::Data(DataError::MissingData { .. })));
    }

    #[test]
    fn test_all_missing_treatment_is_empty_group() {
        let frame = DataFrame::new(vec![
            Column::new("city".into(), ["a", "b"]),
            Column::new("year".into(), [1i64, 1]),
            Column::new("y".into(), [1.0, 2.0]),
            Column::new("x".into(), [None::<f64>, None]),
        ])
        .unwrap();
        let panel = PanelTable::new(frame, "city", "year").unwrap();
        let err = PreparedPanel::prepare(panel, &config()).unwrap_err();
        assert!(matches!(err, RunError::Data(DataError::EmptyGroup)));
    }
}
