//! Integration tests for summary export.

use panelfe_data::PanelTable;
use panelfe_estimate::{EstimationError, FailureKind, PanelRegression, RegressionSpec};
use panelfe_output::{
    ExportFormat, Exporter, FAILURE_COLUMNS, FailureRow, MemorySink, OutputSink, ReportBuilder,
    SUMMARY_COLUMNS, SummaryRow, SummaryTable, describe,
};
use polars::prelude::*;

fn panel() -> PanelTable {
    let mut city = Vec::new();
    let mut year = Vec::new();
    let mut treat = Vec::new();
    let mut dep = Vec::new();
    for (e, name) in ["A", "B", "C", "D", "E"].iter().enumerate() {
        for t in 0..4 {
            let x = ((e * 5 + t * 3) % 7) as f64;
            city.push(*name);
            year.push(2013 + t as i64);
            treat.push(x);
            dep.push(1.2 * x + e as f64 - 0.5 * t as f64 + if (e + t) % 3 == 0 { 0.1 } else { -0.05 });
        }
    }
    let frame = DataFrame::new(vec![
        Column::new("city".into(), city),
        Column::new("year".into(), year),
        Column::new("renewal".into(), treat),
        Column::new("pm25".into(), dep),
    ])
    .unwrap();
    PanelTable::new(frame, "city", "year").unwrap()
}

#[test]
fn test_summary_csv_matches_schema() {
    let regression = PanelRegression::default();
    let result = regression
        .fit(&panel(), &RegressionSpec::new("baseline_level", "pm25", "renewal"))
        .unwrap();

    let rows = vec![SummaryRow::from(&result)];
    let csv = rows.export_to_string(ExportFormat::Csv).unwrap();
    let header = csv.lines().next().unwrap();
    assert_eq!(header, SUMMARY_COLUMNS.join(","));
    assert!(csv.lines().nth(1).unwrap().starts_with("baseline_level,pm25,renewal,"));
}

#[test]
fn test_failures_and_report_through_sink() {
    let regression = PanelRegression::default();
    let err = regression
        .fit(&panel(), &RegressionSpec::new("delta_dep", "absent", "renewal"))
        .unwrap_err();
    assert!(matches!(err, EstimationError::Data(_)));

    let failures = vec![FailureRow::new("delta_dep", err.kind(), err.to_string())];
    assert_eq!(failures[0].kind, FailureKind::MissingData.name());

    let mut sink = MemorySink::new();
    sink.write_text(
        "fe_regression_failures.csv",
        &failures.export_to_string(ExportFormat::Csv).unwrap(),
    )
    .unwrap();
    let written = sink.get("fe_regression_failures.csv").unwrap();
    assert_eq!(written.lines().next().unwrap(), FAILURE_COLUMNS.join(","));

    let report = ReportBuilder::new()
        .name("export test")
        .table(SummaryTable::new(Vec::new(), failures))
        .build();
    sink.write_text("report.json", &report.to_json().unwrap()).unwrap();
    assert!(sink.get("report.json").unwrap().contains("MissingDataError"));
}

#[test]
fn test_descriptives_export() {
    let stats = describe(&panel(), &["pm25", "renewal"]).unwrap();
    let csv = stats.export_to_string(ExportFormat::Csv).unwrap();
    assert_eq!(
        csv.lines().next().unwrap(),
        "variable,count,mean,std,min,25%,50%,75%,max"
    );
    assert_eq!(csv.lines().count(), 3);
}
