//! Within (two-way fixed-effects) OLS.
//!
//! The dependent variable and every regressor are demeaned by entity and
//! time, then OLS without an intercept is run on the demeaned data:
//!
//! ```text
//! beta = (X'X)^-1 X'y        (X, y demeaned)
//! R2_within = 1 - RSS / TSS  (TSS = sum of squared demeaned y)
//! K = (E - 1) + (T - 1) + k
//! ```

use crate::demean::{DemeanConfig, TwoWayDemeaner};
use crate::error::{EstimationError, Result};
use crate::linalg::{self, LinalgError};
use ndarray::{Array1, Array2};
use panelfe_data::PanelSample;
use serde::{Deserialize, Serialize};

/// Settings for the within estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WithinConfig {
    /// Demeaning convergence settings
    pub demean: DemeanConfig,
    /// Relative threshold below which a regressor counts as absorbed (default: 1e-10)
    pub collinearity_tolerance: f64,
}

impl Default for WithinConfig {
    fn default() -> Self {
        Self {
            demean: DemeanConfig::default(),
            collinearity_tolerance: linalg::DEFAULT_PIVOT_TOLERANCE,
        }
    }
}

/// Point estimates and the pieces needed for covariance estimation.
#[derive(Debug, Clone)]
pub struct WithinFit {
    /// Regressor names, in coefficient order
    pub regressors: Vec<String>,
    /// Coefficient estimates
    pub coefficients: Array1<f64>,
    /// Demeaned regressors (n × k)
    pub design: Array2<f64>,
    /// Residuals of the demeaned regression
    pub residuals: Array1<f64>,
    /// `(X'X)^-1` of the demeaned regressors
    pub xtx_inv: Array2<f64>,
    /// Dense entity index per row, used as the cluster id
    pub clusters: Vec<usize>,
    /// Observations
    pub n_obs: usize,
    /// Distinct entities
    pub n_entities: usize,
    /// Distinct periods
    pub n_periods: usize,
    /// Residual sum of squares
    pub rss: f64,
    /// Total sum of squares of the demeaned dependent variable
    pub tss: f64,
    /// Within R²
    pub r2_within: f64,
    /// Demeaning sweeps used for the dependent variable
    pub demean_iterations: usize,
}

impl WithinFit {
    /// Number of regressors.
    pub fn n_regressors(&self) -> usize {
        self.coefficients.len()
    }

    /// Effective parameter count `(E - 1) + (T - 1) + k`.
    pub fn effective_parameters(&self) -> usize {
        (self.n_entities - 1) + (self.n_periods - 1) + self.n_regressors()
    }

    /// Residual degrees of freedom `N - K`, `None` when not positive.
    pub fn residual_dof(&self) -> Option<usize> {
        self.n_obs
            .checked_sub(self.effective_parameters())
            .filter(|dof| *dof > 0)
    }

    /// Coefficient of a regressor by name.
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.regressors
            .iter()
            .position(|r| r == name)
            .map(|i| self.coefficients[i])
    }
}

/// Two-way fixed-effects OLS.
#[derive(Debug, Clone, Default)]
pub struct WithinEstimator {
    config: WithinConfig,
}

impl WithinEstimator {
    /// Create a new estimator.
    pub const fn new(config: WithinConfig) -> Self {
        Self { config }
    }

    /// Estimator configuration.
    pub const fn config(&self) -> &WithinConfig {
        &self.config
    }

    /// Fit the regression on a complete-case sample.
    ///
    /// # Errors
    ///
    /// - [`EstimationError::InsufficientVariation`] with fewer than two
    ///   entities or periods
    /// - [`EstimationError::NoRegressors`] for an empty regressor list
    /// - [`EstimationError::PerfectCollinearity`] when a regressor has no
    ///   variation left after demeaning, or is a combination of others
    pub fn fit(&self, sample: &PanelSample) -> Result<WithinFit> {
        let n_entities = sample.n_entities();
        let n_periods = sample.n_periods();
        if n_entities < 2 || n_periods < 2 {
            return Err(EstimationError::InsufficientVariation {
                entities: n_entities,
                periods: n_periods,
            });
        }
        let regressors = sample.regressors().to_vec();
        if regressors.is_empty() {
            return Err(EstimationError::NoRegressors {
                dependent: sample.dependent().to_string(),
            });
        }

        let n = sample.len();
        let k = regressors.len();
        let demeaner = TwoWayDemeaner::for_sample(sample, self.config.demean)?;

        let y_dm = demeaner.demean(sample.y())?;
        let mut design = Array2::<f64>::zeros((n, k));
        for (j, (name, column)) in regressors.iter().zip(sample.columns()).enumerate() {
            let demeaned = demeaner.demean(column)?;
            if self.is_absorbed(column, &demeaned.values) {
                return Err(EstimationError::PerfectCollinearity {
                    column: name.clone(),
                });
            }
            for (i, v) in demeaned.values.into_iter().enumerate() {
                design[[i, j]] = v;
            }
        }
        let y = Array1::from_vec(y_dm.values);

        let xtx = design.t().dot(&design);
        let xtx_inv = match linalg::invert_spd(&xtx, self.config.collinearity_tolerance) {
            Ok(inv) => inv,
            Err(LinalgError::Singular { pivot }) => {
                return Err(EstimationError::PerfectCollinearity {
                    column: regressors[pivot].clone(),
                });
            }
            Err(LinalgError::NotSquare { rows, cols }) => {
                return Err(EstimationError::DimensionMismatch {
                    expected: rows,
                    actual: cols,
                });
            }
        };

        let coefficients = xtx_inv.dot(&design.t().dot(&y));
        let residuals = &y - &design.dot(&coefficients);
        let rss = residuals.dot(&residuals);
        let tss = y.dot(&y);
        let r2_within = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };

        tracing::debug!(
            dependent = sample.dependent(),
            nobs = n,
            entities = n_entities,
            periods = n_periods,
            demean_iterations = y_dm.iterations,
            r2_within,
            "within regression fitted"
        );

        Ok(WithinFit {
            regressors,
            coefficients,
            design,
            residuals,
            xtx_inv,
            clusters: sample.entity_index().to_vec(),
            n_obs: n,
            n_entities,
            n_periods,
            rss,
            tss,
            r2_within,
            demean_iterations: y_dm.iterations,
        })
    }

    /// Whether demeaning left a regressor with no usable variation.
    fn is_absorbed(&self, original: &[f64], demeaned: &[f64]) -> bool {
        let tol = self.config.collinearity_tolerance;
        let n = original.len() as f64;
        let mean = original.iter().sum::<f64>() / n;
        let ss_centered: f64 = original.iter().map(|v| (v - mean).powi(2)).sum();
        let ss_demeaned: f64 = demeaned.iter().map(|v| v * v).sum();
        let max_abs = original.iter().fold(0.0_f64, |m, v| m.max(v.abs()));

        ss_demeaned <= tol * ss_centered || (ss_demeaned / n).sqrt() <= tol * max_abs
    }
}
