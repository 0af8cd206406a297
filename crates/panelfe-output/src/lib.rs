#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/panelfe/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod report;
pub mod sink;
pub mod summary;
pub mod table;

pub use export::{ExportError, ExportFormat, Exporter, empty_csv};
pub use report::{Report, ReportBuilder, ReportError};
pub use sink::{DirectorySink, MemorySink, OutputSink};
pub use summary::{Descriptive, describe, mean_by_group, mean_by_time};
pub use table::{FAILURE_COLUMNS, FailureRow, SUMMARY_COLUMNS, SummaryRow, SummaryTable};
