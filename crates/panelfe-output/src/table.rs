//! Regression summary tables.

use panelfe_estimate::{FailureKind, RegressionResult};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column order of the summary table.
pub const SUMMARY_COLUMNS: [&str; 12] = [
    "sample",
    "dep_var",
    "treat_var",
    "coef",
    "se",
    "p",
    "ci_low",
    "ci_high",
    "nobs",
    "n_entity",
    "n_time",
    "r2_within",
];

/// Column order of the failure table.
pub const FAILURE_COLUMNS: [&str; 3] = ["sample", "kind", "message"];

/// One successful regression, flattened for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Sample label
    pub sample: String,
    /// Dependent variable
    pub dep_var: String,
    /// Treatment variable
    pub treat_var: String,
    /// Treatment coefficient
    pub coef: f64,
    /// Standard error
    pub se: f64,
    /// Two-sided p-value
    pub p: f64,
    /// Lower 95% bound
    pub ci_low: f64,
    /// Upper 95% bound
    pub ci_high: f64,
    /// Observations used
    pub nobs: usize,
    /// Distinct entities
    pub n_entity: usize,
    /// Distinct periods
    pub n_time: usize,
    /// Within R²
    pub r2_within: f64,
}

impl From<&RegressionResult> for SummaryRow {
    fn from(result: &RegressionResult) -> Self {
        Self {
            sample: result.sample.clone(),
            dep_var: result.dep_var.clone(),
            treat_var: result.treat_var.clone(),
            coef: result.coef,
            se: result.se,
            p: result.p,
            ci_low: result.ci_low,
            ci_high: result.ci_high,
            nobs: result.nobs,
            n_entity: result.n_entity,
            n_time: result.n_time,
            r2_within: result.r2_within,
        }
    }
}

/// One failed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRow {
    /// Sample label
    pub sample: String,
    /// Error kind name
    pub kind: String,
    /// Error message
    pub message: String,
}

impl FailureRow {
    /// Create a failure row.
    pub fn new(sample: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            sample: sample.into(),
            kind: kind.name().to_string(),
            message: message.into(),
        }
    }
}

/// Ordered summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    /// Successful regressions in run order
    pub rows: Vec<SummaryRow>,
    /// Failed configurations in run order
    pub failures: Vec<FailureRow>,
}

impl SummaryTable {
    /// Create a table from rows and failures.
    pub const fn new(rows: Vec<SummaryRow>, failures: Vec<FailureRow>) -> Self {
        Self { rows, failures }
    }

    /// Row for a sample label.
    pub fn row(&self, sample: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.sample == sample)
    }

    /// Summary rows as a polars `DataFrame` with [`SUMMARY_COLUMNS`].
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let rows = &self.rows;
        let text = |f: fn(&SummaryRow) -> &str| rows.iter().map(f).collect::<Vec<_>>();
        let real = |f: fn(&SummaryRow) -> f64| rows.iter().map(f).collect::<Vec<_>>();
        let count = |f: fn(&SummaryRow) -> usize| rows.iter().map(|r| f(r) as u64).collect::<Vec<_>>();

        DataFrame::new(vec![
            Column::new("sample".into(), text(|r| r.sample.as_str())),
            Column::new("dep_var".into(), text(|r| r.dep_var.as_str())),
            Column::new("treat_var".into(), text(|r| r.treat_var.as_str())),
            Column::new("coef".into(), real(|r| r.coef)),
            Column::new("se".into(), real(|r| r.se)),
            Column::new("p".into(), real(|r| r.p)),
            Column::new("ci_low".into(), real(|r| r.ci_low)),
            Column::new("ci_high".into(), real(|r| r.ci_high)),
            Column::new("nobs".into(), count(|r| r.nobs)),
            Column::new("n_entity".into(), count(|r| r.n_entity)),
            Column::new("n_time".into(), count(|r| r.n_time)),
            Column::new("r2_within".into(), real(|r| r.r2_within)),
        ])
    }

    /// Render the table in ASCII format.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\nTwo-Way Fixed Effects Regressions\n");
        output.push_str(&"=".repeat(96));
        output.push('\n');
        output.push_str(&format!(
            "{:<20} {:<12} {:>10} {:>10} {:>8} {:>22} {:>6} {:>4}\n",
            "Sample", "Dep. var", "Coef", "SE", "p", "95% CI", "N", "R2w"
        ));
        output.push_str(&"-".repeat(96));
        output.push('\n');

        for row in &self.rows {
            output.push_str(&format!(
                "{:<20} {:<12} {:>10.4} {:>10.4} {:>8.4} [{:>9.4}, {:>9.4}] {:>6} {:>4.2}\n",
                row.sample,
                row.dep_var,
                row.coef,
                row.se,
                row.p,
                row.ci_low,
                row.ci_high,
                row.nobs,
                row.r2_within
            ));
        }

        if !self.failures.is_empty() {
            output.push_str(&"-".repeat(96));
            output.push('\n');
            for failure in &self.failures {
                output.push_str(&format!(
                    "{:<20} {}: {}\n",
                    failure.sample, failure.kind, failure.message
                ));
            }
        }

        output.push_str(&"=".repeat(96));
        output.push('\n');
        output
    }

    /// Render the table in Markdown format.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Two-Way Fixed Effects Regressions\n\n");
        output.push_str("| Sample | Dep. var | Coef | SE | p | CI low | CI high | N | Entities | Periods | R² within |\n");
        output.push_str("|--------|----------|------|----|---|--------|---------|---|----------|---------|-----------|\n");
        for row in &self.rows {
            output.push_str(&format!(
                "| {} | {} | {:.4} | {:.4} | {:.4} | {:.4} | {:.4} | {} | {} | {} | {:.3} |\n",
                row.sample,
                row.dep_var,
                row.coef,
                row.se,
                row.p,
                row.ci_low,
                row.ci_high,
                row.nobs,
                row.n_entity,
                row.n_time,
                row.r2_within
            ));
        }

        if !self.failures.is_empty() {
            output.push_str("\n## Failed Samples\n\n");
            output.push_str("| Sample | Kind | Message |\n");
            output.push_str("|--------|------|---------|\n");
            for failure in &self.failures {
                output.push_str(&format!(
                    "| {} | {} | {} |\n",
                    failure.sample, failure.kind, failure.message
                ));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sample: &str, coef: f64) -> SummaryRow {
        SummaryRow {
            sample: sample.to_string(),
            dep_var: "y".to_string(),
            treat_var: "x".to_string(),
            coef,
            se: 0.1,
            p: 0.01,
            ci_low: coef - 0.196,
            ci_high: coef + 0.196,
            nobs: 30,
            n_entity: 10,
            n_time: 3,
            r2_within: 0.4,
        }
    }

    fn table() -> SummaryTable {
        SummaryTable::new(
            vec![row("baseline_level", 0.5), row("delta_dep", 0.3)],
            vec![FailureRow::new(
                "hetero_high",
                FailureKind::PerfectCollinearity,
                "x is absorbed",
            )],
        )
    }

    #[test]
    fn test_dataframe_columns() {
        let df = table().to_dataframe().unwrap();
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, SUMMARY_COLUMNS.to_vec());
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_ascii_table_lists_everything() {
        let ascii = table().to_ascii_table();
        assert!(ascii.contains("baseline_level"));
        assert!(ascii.contains("delta_dep"));
        assert!(ascii.contains("PerfectCollinearityError"));
    }

    #[test]
    fn test_markdown() {
        let markdown = table().to_markdown();
        assert!(markdown.contains("# Two-Way Fixed Effects Regressions"));
        assert!(markdown.contains("| baseline_level |"));
        assert!(markdown.contains("## Failed Samples"));
    }

    #[test]
    fn test_row_lookup() {
        assert!(table().row("delta_dep").is_some());
        assert!(table().row("winsor_1_99").is_none());
    }
}
