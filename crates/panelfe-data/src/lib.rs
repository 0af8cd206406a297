#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/panelfe/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod grouping;
pub mod io;
pub mod panel;
pub mod quantile;
pub mod sample;
pub mod winsorize;

pub use error::{DataError, Result};
pub use grouping::{GroupAssignment, GroupLabel, TercileConfig, assign_groups, entity_means};
pub use panel::PanelTable;
pub use quantile::Interpolation;
pub use sample::PanelSample;
pub use winsorize::{WinsorBounds, WinsorConfig, winsorize};
