//! Coefficient covariance estimators.
//!
//! The default is the entity-clustered sandwich
//!
//! ```text
//! V = c * (X'X)^-1 (sum_g s_g s_g') (X'X)^-1,   s_g = X_g' e_g
//! c = (N - 1) / (N - K) * G / (G - 1)
//! ```
//!
//! with `K` the effective parameter count including absorbed effects. The
//! unadjusted alternative uses `sigma^2 (X'X)^-1` with `sigma^2 = RSS / (N - K)`.

use crate::error::{EstimationError, Result};
use crate::within::WithinFit;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Trait for coefficient covariance estimators.
pub trait CovarianceEstimator {
    /// Short name used in reports.
    fn name(&self) -> &'static str;

    /// Covariance matrix of the coefficients (k × k).
    fn estimate(&self, fit: &WithinFit) -> Result<Array2<f64>>;

    /// Standard errors, the square roots of the diagonal.
    fn standard_errors(&self, fit: &WithinFit) -> Result<Array1<f64>> {
        let cov = self.estimate(fit)?;
        Ok(cov.diag().mapv(|v| v.max(0.0).sqrt()))
    }
}

/// Entity-clustered (Liang–Zeger) covariance with small-sample correction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusteredCovariance;

impl CovarianceEstimator for ClusteredCovariance {
    fn name(&self) -> &'static str {
        "clustered"
    }

    fn estimate(&self, fit: &WithinFit) -> Result<Array2<f64>> {
        cluster_robust_covariance(
            &fit.design,
            &fit.residuals,
            &fit.xtx_inv,
            &fit.clusters,
            fit.effective_parameters(),
        )
    }
}

/// Homoskedastic covariance `sigma^2 (X'X)^-1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnadjustedCovariance;

impl CovarianceEstimator for UnadjustedCovariance {
    fn name(&self) -> &'static str {
        "unadjusted"
    }

    fn estimate(&self, fit: &WithinFit) -> Result<Array2<f64>> {
        let dof = fit
            .residual_dof()
            .ok_or(EstimationError::InsufficientDegreesOfFreedom {
                observations: fit.n_obs,
                parameters: fit.effective_parameters(),
            })?;
        let sigma2 = fit.rss / dof as f64;
        Ok(&fit.xtx_inv * sigma2)
    }
}

/// Covariance estimator selection for configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceKind {
    /// Cluster by entity
    #[default]
    Clustered,
    /// Homoskedastic errors
    Unadjusted,
}

impl CovarianceKind {
    /// Estimator for this kind.
    pub fn estimator(&self) -> Box<dyn CovarianceEstimator + Send + Sync> {
        match self {
            Self::Clustered => Box::new(ClusteredCovariance),
            Self::Unadjusted => Box::new(UnadjustedCovariance),
        }
    }
}

/// Cluster-robust covariance from the pieces of a fitted regression.
///
/// `clusters` holds a dense cluster index per row. `parameters` is the
/// effective parameter count used in the `(N - 1) / (N - K)` factor.
///
/// # Errors
///
/// - [`EstimationError::TooFewClusters`] with fewer than two clusters
/// - [`EstimationError::InsufficientDegreesOfFreedom`] when `N <= K`
/// - [`EstimationError::DimensionMismatch`] for misaligned inputs
pub fn cluster_robust_covariance(
    design: &Array2<f64>,
    residuals: &Array1<f64>,
    xtx_inv: &Array2<f64>,
    clusters: &[usize],
    parameters: usize,
) -> Result<Array2<f64>> {
    let (n, k) = design.dim();
    if residuals.len() != n || clusters.len() != n {
        return Err(EstimationError::DimensionMismatch {
            expected: n,
            actual: if residuals.len() != n {
                residuals.len()
            } else {
                clusters.len()
            },
        });
    }
    if xtx_inv.dim() != (k, k) {
        return Err(EstimationError::DimensionMismatch {
            expected: k,
            actual: xtx_inv.nrows(),
        });
    }

    let levels = clusters.iter().copied().max().map_or(0, |m| m + 1);
    let mut scores = Array2::<f64>::zeros((levels, k));
    let mut seen = vec![false; levels];
    for (i, &g) in clusters.iter().enumerate() {
        seen[g] = true;
        let e = residuals[i];
        for j in 0..k {
            scores[[g, j]] += design[[i, j]] * e;
        }
    }
    let g = seen.iter().filter(|s| **s).count();
    if g < 2 {
        return Err(EstimationError::TooFewClusters { clusters: g });
    }
    if n <= parameters {
        return Err(EstimationError::InsufficientDegreesOfFreedom {
            observations: n,
            parameters,
        });
    }

    let meat = scores.t().dot(&scores);
    let nf = n as f64;
    let gf = g as f64;
    let correction = (nf - 1.0) / (nf - parameters as f64) * gf / (gf - 1.0);

    Ok(xtx_inv.dot(&meat).dot(xtx_inv) * correction)
}
