//! Error types for fixed-effects estimation.

use panelfe_data::DataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for estimation.
pub type Result<T> = std::result::Result<T, EstimationError>;

/// Errors that can occur while fitting a regression.
#[derive(Debug, Error)]
pub enum EstimationError {
    /// Fewer than two entities or two periods in the sample
    #[error(
        "Insufficient variation: {entities} entities and {periods} periods (need at least 2 of each)"
    )]
    InsufficientVariation {
        /// Distinct entities in the sample
        entities: usize,
        /// Distinct periods in the sample
        periods: usize,
    },

    /// A regressor is absorbed by the fixed effects or by other regressors
    #[error("Regressor {column} is perfectly collinear with the fixed effects or other regressors")]
    PerfectCollinearity {
        /// First regressor found to be redundant
        column: String,
    },

    /// Cluster-robust covariance needs at least two clusters
    #[error("Too few clusters: {clusters} (need at least 2)")]
    TooFewClusters {
        /// Number of clusters in the sample
        clusters: usize,
    },

    /// No residual degrees of freedom after absorbing the fixed effects
    #[error("No residual degrees of freedom: {observations} observations, {parameters} parameters")]
    InsufficientDegreesOfFreedom {
        /// Observations in the sample
        observations: usize,
        /// Effective parameter count including absorbed effects
        parameters: usize,
    },

    /// Alternating demeaning did not reach the tolerance
    #[error("Demeaning did not converge after {iterations} iterations")]
    DemeaningDidNotConverge {
        /// Iterations performed
        iterations: usize,
    },

    /// A regression needs at least one regressor
    #[error("Regression of {dependent} has no regressors")]
    NoRegressors {
        /// Dependent variable
        dependent: String,
    },

    /// Dimension mismatch between inputs
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Error raised while building the sample
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Coarse classification of a failed run, used in failure tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Malformed quantile bounds
    InvalidQuantile,
    /// Empty entity set when grouping
    EmptyGroup,
    /// Missing columns or no complete observations
    MissingData,
    /// Too few entities or periods
    InsufficientVariation,
    /// Regressor absorbed by the fixed effects
    PerfectCollinearity,
    /// Fewer than two clusters
    TooFewClusters,
    /// No residual degrees of freedom
    InsufficientDegreesOfFreedom,
    /// Demeaning failed to converge
    Convergence,
    /// Anything else
    Other,
}

impl FailureKind {
    /// Name written to failure tables.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InvalidQuantile => "InvalidQuantileError",
            Self::EmptyGroup => "EmptyGroupError",
            Self::MissingData => "MissingDataError",
            Self::InsufficientVariation => "InsufficientVariationError",
            Self::PerfectCollinearity => "PerfectCollinearityError",
            Self::TooFewClusters => "TooFewClustersError",
            Self::InsufficientDegreesOfFreedom => "InsufficientDegreesOfFreedomError",
            Self::Convergence => "ConvergenceError",
            Self::Other => "Error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&DataError> for FailureKind {
    fn from(err: &DataError) -> Self {
        match err {
            DataError::InvalidQuantile { .. } => Self::InvalidQuantile,
            DataError::EmptyGroup => Self::EmptyGroup,
            DataError::MissingData { .. } => Self::MissingData,
            _ => Self::Other,
        }
    }
}

impl EstimationError {
    /// Failure classification for this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InsufficientVariation { .. } => FailureKind::InsufficientVariation,
            Self::PerfectCollinearity { .. } => FailureKind::PerfectCollinearity,
            Self::TooFewClusters { .. } => FailureKind::TooFewClusters,
            Self::InsufficientDegreesOfFreedom { .. } => FailureKind::InsufficientDegreesOfFreedom,
            Self::DemeaningDidNotConverge { .. } => FailureKind::Convergence,
            Self::NoRegressors { .. } => FailureKind::MissingData,
            Self::DimensionMismatch { .. } => FailureKind::Other,
            Self::Data(err) => FailureKind::from(err),
        }
    }
}
