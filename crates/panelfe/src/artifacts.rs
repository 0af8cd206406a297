//! Files written at the end of a run.

use crate::config::RunConfig;
use crate::error::Result;
use crate::prepare::PreparedPanel;
use crate::runs::{Orchestrator, RunReport};
use panelfe_data::PanelTable;
use panelfe_output::{
    ExportFormat, Exporter, FAILURE_COLUMNS, OutputSink, ReportBuilder, SUMMARY_COLUMNS,
    describe, empty_csv, mean_by_group, mean_by_time,
};
use polars::prelude::DataFrame;

/// Prepared panel with derived columns.
pub const CLEANED_PANEL: &str = "panel_data_cleaned.csv";
/// Descriptive statistics of the core variables.
pub const DESCRIPTIVES: &str = "desc_core_vars.csv";
/// Means by time period.
pub const MEAN_BY_TIME: &str = "mean_by_year.csv";
/// Means by group label.
pub const MEAN_BY_GROUP: &str = "mean_by_group.csv";
/// One row per successful regression.
pub const SUMMARY: &str = "fe_regression_summary.csv";
/// One row per failed regression.
pub const FAILURES: &str = "fe_regression_failures.csv";
/// Full JSON report.
pub const REPORT: &str = "fe_regression_report.json";

/// Write the descriptive tables of a prepared panel.
pub fn write_descriptives(
    prepared: &PreparedPanel,
    config: &RunConfig,
    sink: &mut dyn OutputSink,
) -> Result<()> {
    let panel = prepared.panel();
    let delta = config.delta_column();

    let mut cleaned: DataFrame = panel.frame().clone();
    sink.write_frame(CLEANED_PANEL, &mut cleaned)?;

    let stats = describe(
        panel,
        &[config.dependent.as_str(), config.treatment.as_str(), delta.as_str()],
    )?;
    sink.write_text(DESCRIPTIVES, &stats.export_to_string(ExportFormat::Csv)?)?;

    let means = [config.treatment.as_str(), config.dependent.as_str()];
    sink.write_frame(MEAN_BY_TIME, &mut mean_by_time(panel, &means)?)?;
    sink.write_frame(
        MEAN_BY_GROUP,
        &mut mean_by_group(panel, &config.group_column, &means)?,
    )?;
    Ok(())
}

/// Write the regression summary, the failure table and the JSON report.
pub fn write_results(report: &RunReport, config: &RunConfig, sink: &mut dyn OutputSink) -> Result<()> {
    let table = report.summary_table();

    let summary = if table.rows.is_empty() {
        empty_csv(&SUMMARY_COLUMNS)?
    } else {
        table.rows.export_to_string(ExportFormat::Csv)?
    };
    sink.write_text(SUMMARY, &summary)?;

    let failures = if table.failures.is_empty() {
        empty_csv(&FAILURE_COLUMNS)?
    } else {
        table.failures.export_to_string(ExportFormat::Csv)?
    };
    sink.write_text(FAILURES, &failures)?;

    let json = ReportBuilder::new()
        .name(format!("{} on {}", config.dependent, config.treatment))
        .config(config)?
        .table(table)
        .build()
        .to_json()?;
    sink.write_text(REPORT, &json)?;
    Ok(())
}

/// Prepare the panel, run every regression and write all artifacts.
///
/// Preprocessing errors abort; regression failures end up in the report.
pub fn run_pipeline(frame: DataFrame, config: &RunConfig, sink: &mut dyn OutputSink) -> Result<RunReport> {
    config.validate()?;
    let panel = PanelTable::new(frame, &config.entity_column, &config.time_column)?;
    let prepared = PreparedPanel::prepare(panel, config)?;
    write_descriptives(&prepared, config, sink)?;

    let report = Orchestrator::new(config.clone()).run(&prepared);
    write_results(&report, config, sink)?;
    Ok(report)
}
