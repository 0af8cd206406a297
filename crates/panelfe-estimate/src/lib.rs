#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/panelfe/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod covariance;
pub mod demean;
pub mod error;
pub mod inference;
pub mod linalg;
pub mod model;
pub mod within;

pub use covariance::{
    ClusteredCovariance, CovarianceEstimator, CovarianceKind, UnadjustedCovariance,
    cluster_robust_covariance,
};
pub use demean::{DemeanConfig, Demeaned, TwoWayDemeaner};
pub use error::{EstimationError, FailureKind, Result};
pub use inference::{CoefficientTest, Inference};
pub use model::{Coefficient, EstimatorConfig, PanelRegression, RegressionResult, RegressionSpec};
pub use within::{WithinConfig, WithinEstimator, WithinFit};
