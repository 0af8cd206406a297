//! Run configuration.

use crate::error::{Result, RunError};
use panelfe_data::{TercileConfig, WinsorConfig};
use panelfe_estimate::EstimatorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a run needs besides the data.
///
/// Every field has a default, so a JSON file only has to name what differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Entity identifier column (default: `entity`)
    pub entity_column: String,
    /// Time identifier column (default: `time`)
    pub time_column: String,
    /// Dependent variable (default: `y`)
    pub dependent: String,
    /// Treatment variable (default: `treat`)
    pub treatment: String,
    /// Control variables (default: none)
    pub controls: Vec<String>,
    /// Winsorization of the dependent and treatment variables
    pub winsor: WinsorConfig,
    /// Tercile cutoffs for the treatment-intensity groups
    pub tercile: TercileConfig,
    /// Minimum rows per entity for the restricted sample (default: 3)
    pub min_obs: usize,
    /// Estimation, covariance and inference settings
    pub estimator: EstimatorConfig,
    /// Run the configurations on the rayon pool (default: false)
    pub parallel: bool,
    /// Name of the attached group-label column (default: `group`)
    pub group_column: String,
    /// Prefix of the per-group sample labels (default: `hetero`)
    pub group_prefix: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            entity_column: "entity".to_string(),
            time_column: "time".to_string(),
            dependent: "y".to_string(),
            treatment: "treat".to_string(),
            controls: Vec::new(),
            winsor: WinsorConfig::default(),
            tercile: TercileConfig::default(),
            min_obs: 3,
            estimator: EstimatorConfig::default(),
            parallel: false,
            group_column: "group".to_string(),
            group_prefix: "hetero".to_string(),
        }
    }
}

impl RunConfig {
    /// Config for the given columns with every other setting at its default.
    pub fn new(
        entity_column: impl Into<String>,
        time_column: impl Into<String>,
        dependent: impl Into<String>,
        treatment: impl Into<String>,
    ) -> Self {
        Self {
            entity_column: entity_column.into(),
            time_column: time_column.into(),
            dependent: dependent.into(),
            treatment: treatment.into(),
            ..Self::default()
        }
    }

    /// Load a config from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Name of the differenced dependent variable column.
    pub fn delta_column(&self) -> String {
        format!("d_{}", self.dependent)
    }

    /// Name of the per-entity observation count column.
    pub fn count_column(&self) -> String {
        format!("{}_obs_count", self.entity_column)
    }

    /// Check quantile bounds and that the named columns are distinct.
    pub fn validate(&self) -> Result<()> {
        self.winsor.validate()?;
        self.tercile.validate()?;

        let keys = [&self.entity_column, &self.time_column];
        for name in [&self.dependent, &self.treatment].into_iter().chain(&self.controls) {
            if keys.contains(&name) {
                return Err(RunError::InvalidConfig(format!(
                    "{name} is used both as a key and as a regression variable"
                )));
            }
        }
        if self.dependent == self.treatment {
            return Err(RunError::InvalidConfig(format!(
                "{} is both the dependent and the treatment variable",
                self.dependent
            )));
        }
        Ok(())
    }
}
