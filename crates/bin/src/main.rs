//! panelfe CLI binary.
//!
//! Runs the fixed-effects regression sequence over a panel stored as CSV.

mod logging;

use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use panelfe::{
    Orchestrator, PreparedPanel, RunConfig, RunError, RunReport, write_descriptives, write_results,
};
use panelfe_data::PanelTable;
use panelfe_data::io::read_csv;
use panelfe_estimate::{CovarianceKind, Inference};
use panelfe_output::{Descriptive, DirectorySink, ExportFormat, Exporter, describe};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "panelfe")]
#[command(about = "panelfe: Two-way fixed-effects panel regressions", long_about = None)]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every regression and write the result tables
    Run(RunArgs),

    /// Print descriptive statistics of panel columns
    Describe {
        /// Panel CSV file
        data: PathBuf,

        /// Entity identifier column
        #[arg(long, default_value = "entity")]
        entity: String,

        /// Time identifier column
        #[arg(long, default_value = "time")]
        time: String,

        /// Columns to summarize, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the default run configuration as JSON
    Config,
}

#[derive(Args)]
struct RunArgs {
    /// Panel CSV file
    data: PathBuf,

    /// JSON run configuration; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the output tables
    #[arg(long, default_value = "results")]
    out: PathBuf,

    /// Entity identifier column
    #[arg(long)]
    entity: Option<String>,

    /// Time identifier column
    #[arg(long)]
    time: Option<String>,

    /// Dependent variable
    #[arg(long)]
    dep: Option<String>,

    /// Treatment variable
    #[arg(long)]
    treat: Option<String>,

    /// Control variables, comma separated
    #[arg(long, value_delimiter = ',')]
    controls: Vec<String>,

    /// Minimum rows per entity for the restricted sample
    #[arg(long)]
    min_obs: Option<usize>,

    /// Lower winsorization quantile
    #[arg(long)]
    winsor_lower: Option<f64>,

    /// Upper winsorization quantile
    #[arg(long)]
    winsor_upper: Option<f64>,

    /// Reference distribution for p-values and intervals
    #[arg(long, value_enum)]
    inference: Option<InferenceArg>,

    /// Coefficient covariance estimator
    #[arg(long, value_enum)]
    covariance: Option<CovarianceArg>,

    /// Run the regressions in parallel
    #[arg(long)]
    parallel: bool,

    /// Output format for the summary printed to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InferenceArg {
    Normal,
    StudentT,
}

impl From<InferenceArg> for Inference {
    fn from(arg: InferenceArg) -> Self {
        match arg {
            InferenceArg::Normal => Self::Normal,
            InferenceArg::StudentT => Self::StudentT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CovarianceArg {
    Clustered,
    Unadjusted,
}

impl From<CovarianceArg> for CovarianceKind {
    fn from(arg: CovarianceArg) -> Self {
        match arg {
            CovarianceArg::Clustered => Self::Clustered,
            CovarianceArg::Unadjusted => Self::Unadjusted,
        }
    }
}

impl RunArgs {
    /// Config file (or defaults) with command-line overrides applied.
    fn run_config(&self) -> Result<RunConfig, RunError> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(entity) = &self.entity {
            config.entity_column = entity.clone();
        }
        if let Some(time) = &self.time {
            config.time_column = time.clone();
        }
        if let Some(dep) = &self.dep {
            config.dependent = dep.clone();
        }
        if let Some(treat) = &self.treat {
            config.treatment = treat.clone();
        }
        if !self.controls.is_empty() {
            config.controls = self.controls.clone();
        }
        if let Some(min_obs) = self.min_obs {
            config.min_obs = min_obs;
        }
        if let Some(lower) = self.winsor_lower {
            config.winsor.lower = lower;
        }
        if let Some(upper) = self.winsor_upper {
            config.winsor.upper = upper;
        }
        if let Some(inference) = self.inference {
            config.estimator.inference = inference.into();
        }
        if let Some(covariance) = self.covariance {
            config.estimator.covariance = covariance.into();
        }
        config.parallel |= self.parallel;

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.json_logs);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run(args) => run_regressions(&args)?,
        Commands::Describe {
            data,
            entity,
            time,
            columns,
            format,
        } => describe_columns(&data, &entity, &time, &columns, format)?,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&RunConfig::default())?);
        }
    }

    Ok(())
}

fn run_regressions(args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.run_config()?;

    let frame = read_csv(&args.data)?;
    let panel = PanelTable::new(frame, &config.entity_column, &config.time_column)?;
    tracing::info!(
        rows = panel.height(),
        entities = panel.n_entities(),
        periods = panel.n_periods(),
        "panel ready"
    );

    let prepared = PreparedPanel::prepare(panel, &config)?;
    let mut sink = DirectorySink::new(args.out.clone());
    write_descriptives(&prepared, &config, &mut sink)?;

    let orchestrator = Orchestrator::new(config.clone());
    let report = run_with_progress(&orchestrator, &prepared)?;
    write_results(&report, &config, &mut sink)?;

    let table = report.summary_table();
    match args.format {
        OutputFormat::Text => {
            println!("{}", table.to_ascii_table());
            println!("Results written to {}", args.out.display());
        }
        OutputFormat::Markdown => println!("{}", table.to_markdown()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

fn run_with_progress(
    orchestrator: &Orchestrator,
    prepared: &PreparedPanel,
) -> Result<RunReport, Box<dyn std::error::Error>> {
    if orchestrator.config().parallel {
        let spinner = ProgressBar::new_spinner();
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message("Running regressions in parallel...");
        let report = orchestrator.run(prepared);
        spinner.finish_with_message(format!("{} regressions finished", report.len()));
        return Ok(report);
    }

    let plan = orchestrator.plan();
    let pb = ProgressBar::new(plan.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );

    let report: RunReport = plan
        .iter()
        .map(|run| {
            pb.set_message(run.spec.label().to_string());
            let outcome = orchestrator.execute(prepared, run);
            pb.inc(1);
            outcome
        })
        .collect();

    pb.finish_with_message(format!(
        "{} succeeded, {} failed",
        report.results().count(),
        report.failures().count()
    ));
    Ok(report)
}

fn describe_columns(
    data: &Path,
    entity: &str,
    time: &str,
    columns: &[String],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let panel = PanelTable::new(read_csv(data)?, entity, time)?;
    let names: Vec<&str> = columns.iter().map(String::as_str).collect();
    let stats = describe(&panel, &names)?;

    match format {
        OutputFormat::Json => println!("{}", stats.export_to_string(ExportFormat::PrettyJson)?),
        OutputFormat::Text | OutputFormat::Markdown => print_descriptives(&stats),
    }
    Ok(())
}

fn print_descriptives(stats: &[Descriptive]) {
    let cell = |value: Option<f64>| value.map_or_else(|| "NaN".to_string(), |v| format!("{v:.4}"));

    println!("\nDescriptive Statistics");
    println!("{}", "=".repeat(108));
    println!(
        "{:<20} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Variable", "Count", "Mean", "Std", "Min", "25%", "50%", "75%", "Max"
    );
    println!("{}", "-".repeat(108));
    for row in stats {
        println!(
            "{:<20} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            row.variable,
            row.count,
            cell(row.mean),
            cell(row.std),
            cell(row.min),
            cell(row.p25),
            cell(row.p50),
            cell(row.p75),
            cell(row.max)
        );
    }
    println!("{}", "=".repeat(108));
}
