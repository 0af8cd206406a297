//! Run orchestration.
//!
//! One run fits a fixed sequence of regressions on a prepared panel:
//!
//! 1. `baseline_level`: dependent on treatment
//! 2. `delta_dep`: differenced dependent on treatment
//! 3. `winsor_<lo>_<hi>`: both variables winsorized
//! 4. `<entity>_obs>=<min_obs>`: entities with enough rows
//! 5. `<prefix>_low`, `<prefix>_middle`, `<prefix>_high`: one per group
//!
//! Each regression is independent. A failure is recorded against its label
//! and the remaining regressions still run. Outcomes keep this order, also
//! when the regressions run in parallel.

use crate::config::RunConfig;
use crate::prepare::PreparedPanel;
use panelfe_data::{GroupLabel, PanelTable};
use panelfe_estimate::{
    EstimationError, FailureKind, PanelRegression, RegressionResult, RegressionSpec,
};
use panelfe_output::{FailureRow, SummaryRow, SummaryTable};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Which rows and columns a configuration uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSelection {
    /// Full panel, dependent variable in levels
    Baseline,
    /// Full panel, differenced dependent variable
    Differenced,
    /// Panel with winsorized dependent and treatment variables
    Winsorized,
    /// Entities with at least this many rows
    MinObservations(usize),
    /// Entities carrying one group label
    Group(GroupLabel),
}

/// A labelled regression to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRun {
    /// Sample selection
    pub selection: SampleSelection,
    /// Regression specification, including the sample label
    pub spec: RegressionSpec,
}

/// A configuration that could not be estimated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    /// Sample label
    pub sample: String,
    /// Error classification
    pub kind: FailureKind,
    /// Error message
    pub message: String,
}

/// Result of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The regression was estimated
    Success(RegressionResult),
    /// The regression failed
    Failure(RunFailure),
}

impl RunOutcome {
    /// Sample label of the configuration.
    pub fn sample(&self) -> &str {
        match self {
            Self::Success(result) => &result.sample,
            Self::Failure(failure) => &failure.sample,
        }
    }

    /// The result, if the regression succeeded.
    pub const fn result(&self) -> Option<&RegressionResult> {
        match self {
            Self::Success(result) => Some(result),
            Self::Failure(_) => None,
        }
    }

    /// The failure, if the regression failed.
    pub const fn failure(&self) -> Option<&RunFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

/// Ordered outcomes of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    outcomes: Vec<RunOutcome>,
}

impl RunReport {
    /// Outcomes in run order.
    pub fn outcomes(&self) -> &[RunOutcome] {
        &self.outcomes
    }

    /// Outcome for a sample label.
    pub fn get(&self, sample: &str) -> Option<&RunOutcome> {
        self.outcomes.iter().find(|o| o.sample() == sample)
    }

    /// Successful results in run order.
    pub fn results(&self) -> impl Iterator<Item = &RegressionResult> {
        self.outcomes.iter().filter_map(RunOutcome::result)
    }

    /// Failures in run order.
    pub fn failures(&self) -> impl Iterator<Item = &RunFailure> {
        self.outcomes.iter().filter_map(RunOutcome::failure)
    }

    /// Number of configurations run.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether nothing was run.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Flattened summary for export.
    pub fn summary_table(&self) -> SummaryTable {
        SummaryTable::new(
            self.results().map(SummaryRow::from).collect(),
            self.failures()
                .map(|f| FailureRow::new(f.sample.clone(), f.kind, f.message.clone()))
                .collect(),
        )
    }
}

impl FromIterator<RunOutcome> for RunReport {
    fn from_iter<I: IntoIterator<Item = RunOutcome>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

/// Drives the fixed sequence of regressions over a prepared panel.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: RunConfig,
    regression: PanelRegression,
}

impl Orchestrator {
    /// Create an orchestrator.
    pub fn new(config: RunConfig) -> Self {
        let regression = PanelRegression::new(config.estimator);
        Self { config, regression }
    }

    /// Run configuration.
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The regressions a run performs, in order.
    pub fn plan(&self) -> Vec<PlannedRun> {
        let config = &self.config;
        let spec = |label: String, dependent: &str| {
            RegressionSpec::new(label, dependent, config.treatment.as_str())
                .with_controls(config.controls.iter().cloned())
        };

        let mut plan = vec![
            PlannedRun {
                selection: SampleSelection::Baseline,
                spec: spec("baseline_level".to_string(), &config.dependent),
            },
            PlannedRun {
                selection: SampleSelection::Differenced,
                spec: spec("delta_dep".to_string(), &config.delta_column()),
            },
            PlannedRun {
                selection: SampleSelection::Winsorized,
                spec: spec(format!("winsor_{}", config.winsor.label()), &config.dependent),
            },
            PlannedRun {
                selection: SampleSelection::MinObservations(config.min_obs),
                spec: spec(
                    format!("{}_obs>={}", config.entity_column, config.min_obs),
                    &config.dependent,
                ),
            },
        ];
        plan.extend(GroupLabel::all().into_iter().map(|label| PlannedRun {
            selection: SampleSelection::Group(label),
            spec: spec(
                format!("{}_{}", config.group_prefix, label.name()),
                &config.dependent,
            ),
        }));
        plan
    }

    /// Run every planned regression.
    pub fn run(&self, prepared: &PreparedPanel) -> RunReport {
        let plan = self.plan();
        let report: RunReport = if self.config.parallel {
            plan.par_iter()
                .map(|run| self.execute(prepared, run))
                .collect::<Vec<_>>()
                .into_iter()
                .collect()
        } else {
            plan.iter().map(|run| self.execute(prepared, run)).collect()
        };

        tracing::info!(
            runs = report.len(),
            succeeded = report.results().count(),
            failed = report.failures().count(),
            "run finished"
        );
        report
    }

    /// Run a single planned regression, capturing any failure.
    pub fn execute(&self, prepared: &PreparedPanel, run: &PlannedRun) -> RunOutcome {
        let label = run.spec.label();
        match self.fit(prepared, run) {
            Ok(result) => RunOutcome::Success(result),
            Err(err) => {
                let kind = err.kind();
                tracing::warn!(sample = label, kind = %kind, error = %err, "regression failed");
                RunOutcome::Failure(RunFailure {
                    sample: label.to_string(),
                    kind,
                    message: err.to_string(),
                })
            }
        }
    }

    fn fit(
        &self,
        prepared: &PreparedPanel,
        run: &PlannedRun,
    ) -> Result<RegressionResult, EstimationError> {
        let panel = self.select(prepared, run.selection)?;
        self.regression.fit(&panel, &run.spec)
    }

    fn select(
        &self,
        prepared: &PreparedPanel,
        selection: SampleSelection,
    ) -> Result<PanelTable, EstimationError> {
        let panel = prepared.panel();
        let subset = match selection {
            SampleSelection::Baseline | SampleSelection::Differenced => panel.clone(),
            SampleSelection::Winsorized => prepared.winsorized().clone(),
            SampleSelection::MinObservations(min_obs) => {
                let mask: Vec<bool> = panel
                    .entity_observation_counts()?
                    .into_iter()
                    .map(|count| count >= min_obs)
                    .collect();
                panel.filter_rows(&mask)?
            }
            SampleSelection::Group(label) => {
                let groups = prepared.groups();
                panel.filter_entities(|entity| groups.label(entity) == Some(label))?
            }
        };
        Ok(subset)
    }
}
