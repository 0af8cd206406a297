//! Regression specifications and results.
//!
//! A [`RegressionSpec`] names the dependent variable, the treatment and any
//! controls, plus the label of the sample it runs on. [`PanelRegression`]
//! extracts the complete-case sample from a panel, fits the within model and
//! attaches covariance and inference for every coefficient.

use crate::covariance::CovarianceKind;
use crate::error::Result;
use crate::inference::Inference;
use crate::within::{WithinConfig, WithinEstimator};
use panelfe_data::{PanelSample, PanelTable};
use serde::{Deserialize, Serialize};

/// What to regress on what, and on which sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegressionSpec {
    label: String,
    dependent: String,
    treatment: String,
    controls: Vec<String>,
}

impl RegressionSpec {
    /// Regression of `dependent` on `treatment` for the sample `label`.
    pub fn new(
        label: impl Into<String>,
        dependent: impl Into<String>,
        treatment: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            dependent: dependent.into(),
            treatment: treatment.into(),
            controls: Vec::new(),
        }
    }

    /// Add control regressors.
    pub fn with_controls(mut self, controls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.controls = controls.into_iter().map(Into::into).collect();
        self
    }

    /// Sample label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Dependent variable.
    pub fn dependent(&self) -> &str {
        &self.dependent
    }

    /// Treatment variable.
    pub fn treatment(&self) -> &str {
        &self.treatment
    }

    /// Control variables.
    pub fn controls(&self) -> &[String] {
        &self.controls
    }

    /// Treatment followed by the controls, without duplicates.
    pub fn regressors(&self) -> Vec<String> {
        let mut regressors = vec![self.treatment.clone()];
        for control in &self.controls {
            if !regressors.contains(control) {
                regressors.push(control.clone());
            }
        }
        regressors
    }
}

/// Estimate and inference for one regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    /// Regressor name
    pub name: String,
    /// Point estimate
    pub coef: f64,
    /// Standard error
    pub se: f64,
    /// t statistic
    pub t_stat: f64,
    /// Two-sided p-value
    pub p: f64,
    /// Lower 95% bound
    pub ci_low: f64,
    /// Upper 95% bound
    pub ci_high: f64,
}

/// Outcome of one successful regression.
///
/// The top-level fields describe the treatment coefficient. `coefficients`
/// carries every regressor, treatment first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Sample label
    pub sample: String,
    /// Dependent variable
    pub dep_var: String,
    /// Treatment variable
    pub treat_var: String,
    /// Treatment coefficient
    pub coef: f64,
    /// Treatment standard error
    pub se: f64,
    /// Treatment p-value
    pub p: f64,
    /// Lower 95% bound for the treatment
    pub ci_low: f64,
    /// Upper 95% bound for the treatment
    pub ci_high: f64,
    /// Observations used
    pub nobs: usize,
    /// Distinct entities in the sample
    pub n_entity: usize,
    /// Distinct periods in the sample
    pub n_time: usize,
    /// Within R²
    pub r2_within: f64,
    /// All coefficients, treatment first
    pub coefficients: Vec<Coefficient>,
}

impl RegressionResult {
    /// Coefficient of a regressor by name.
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }
}

/// Estimator settings shared by every regression of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Within-estimator settings
    pub within: WithinConfig,
    /// Coefficient covariance
    pub covariance: CovarianceKind,
    /// Reference distribution for p-values and intervals
    pub inference: Inference,
}

/// Two-way fixed-effects regression with clustered inference.
#[derive(Debug, Clone, Default)]
pub struct PanelRegression {
    config: EstimatorConfig,
}

impl PanelRegression {
    /// Create a new regression runner.
    pub const fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Runner configuration.
    pub const fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Fit a specification on a panel.
    ///
    /// Rows missing the dependent variable or any regressor are dropped first.
    pub fn fit(&self, panel: &PanelTable, spec: &RegressionSpec) -> Result<RegressionResult> {
        let sample = panel.sample(spec.dependent(), &spec.regressors())?;
        self.fit_sample(&sample, spec)
    }

    /// Fit a specification on an already extracted sample.
    pub fn fit_sample(&self, sample: &PanelSample, spec: &RegressionSpec) -> Result<RegressionResult> {
        let fit = WithinEstimator::new(self.config.within).fit(sample)?;
        let estimator = self.config.covariance.estimator();
        let se = estimator.standard_errors(&fit)?;

        let clusters = fit.n_entities;
        let coefficients: Vec<Coefficient> = fit
            .regressors
            .iter()
            .zip(fit.coefficients.iter().zip(se.iter()))
            .map(|(name, (&coef, &se))| {
                let test = self.config.inference.test(coef, se, clusters);
                Coefficient {
                    name: name.clone(),
                    coef,
                    se,
                    t_stat: test.t_stat,
                    p: test.p_value,
                    ci_low: test.ci_low,
                    ci_high: test.ci_high,
                }
            })
            .collect();

        // the treatment is always the first regressor
        let treatment = coefficients[0].clone();

        tracing::info!(
            sample = spec.label(),
            dep_var = spec.dependent(),
            coef = treatment.coef,
            se = treatment.se,
            nobs = fit.n_obs,
            covariance = estimator.name(),
            "regression fitted"
        );

        Ok(RegressionResult {
            sample: spec.label().to_string(),
            dep_var: spec.dependent().to_string(),
            treat_var: spec.treatment().to_string(),
            coef: treatment.coef,
            se: treatment.se,
            p: treatment.p,
            ci_low: treatment.ci_low,
            ci_high: treatment.ci_high,
            nobs: fit.n_obs,
            n_entity: fit.n_entities,
            n_time: fit.n_periods,
            r2_within: fit.r2_within,
            coefficients,
        })
    }
}
