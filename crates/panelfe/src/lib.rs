#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/panelfe/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod artifacts;
pub mod config;
pub mod error;
pub mod prepare;
pub mod runs;

// Re-export main types from sub-crates
pub use panelfe_data as data;
pub use panelfe_estimate as estimate;
pub use panelfe_output as output;

pub use artifacts::{run_pipeline, write_descriptives, write_results};
pub use config::RunConfig;
pub use error::{Result, RunError};
pub use prepare::PreparedPanel;
pub use runs::{Orchestrator, PlannedRun, RunFailure, RunOutcome, RunReport, SampleSelection};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
