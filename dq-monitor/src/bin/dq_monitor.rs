use clap::{Parser, ValueEnum};
use dq_monitor::config::{ENV_ALERT_DESTINATION, ENV_ALERT_SECRET, ENV_METRICS_NAMESPACE};
use dq_monitor::dataset::EngineConfig;
use dq_monitor::logging::setup::{init_logging, LoggingConfig};
use dq_monitor::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// A reference table given as `db.table=path`.
#[derive(Debug, Clone, PartialEq)]
struct Reference {
    database: String,
    table: String,
    path: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Human,
}

/// Evaluate data quality rules against a table and print a report.
///
/// Exits with 0 when every check passed, 1 when any check failed and 2 when
/// the run could not be performed.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database (schema) the table is registered under
    #[arg(long)]
    database: String,

    /// Table to evaluate
    #[arg(long)]
    table: String,

    /// Rule document (.json, .yaml or .yml)
    #[arg(long)]
    rules: PathBuf,

    /// Data file for the table (.csv, .parquet or .json)
    #[arg(long)]
    source: PathBuf,

    /// Reference table for referential integrity checks, as db.table=path
    #[arg(long = "reference", value_parser = parse_reference)]
    references: Vec<Reference>,

    /// Directory to write the result batch to
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Per-check deadline in seconds
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Number of rules evaluated at once
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
}

fn parse_reference(value: &str) -> std::result::Result<Reference, String> {
    let (name, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected db.table=path, got '{value}'"))?;
    let (database, table) = name
        .split_once('.')
        .ok_or_else(|| format!("expected db.table before '=', got '{name}'"))?;
    if path.is_empty() {
        return Err(format!("missing path for reference '{name}'"));
    }
    Ok(Reference {
        database: database.to_string(),
        table: table.to_string(),
        path: PathBuf::from(path),
    })
}

fn config_from_args(args: &Args) -> MonitorConfig {
    let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

    let mut config = MonitorConfig::new(&args.database, &args.table)
        .with_rules_path(&args.rules)
        .with_check_timeout(Duration::from_secs(args.timeout))
        .with_max_concurrency(args.concurrency);
    if let Some(dir) = &args.results_dir {
        config = config.with_results_path(dir);
    }
    if let Some(namespace) = env(ENV_METRICS_NAMESPACE) {
        config = config.with_metrics_namespace(namespace);
    }
    if let Some(destination) = env(ENV_ALERT_DESTINATION) {
        config = config.with_alert_destination(destination);
    }
    if let Some(secret) = env(ENV_ALERT_SECRET) {
        config = config.with_alert_secret(secret);
    }
    config
}

async fn run(args: &Args) -> Result<MonitorRun> {
    let config = config_from_args(args);
    config.validate()?;

    let provider = DataFusionProvider::with_config(EngineConfig::default())?;
    provider
        .register_file(config.database(), config.table(), &args.source)
        .await?;
    for reference in &args.references {
        provider
            .register_file(&reference.database, &reference.table, &reference.path)
            .await?;
    }

    let monitor = DataQualityMonitor::new(config, Arc::new(provider))?;
    monitor.run().await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let logging = LoggingConfig::default().with_json_format(args.json_logs);
    if let Err(e) = init_logging(logging) {
        eprintln!("failed to initialize logging: {e}");
    }

    let run = match run(&args).await {
        Ok(run) => run,
        Err(e) => {
            tracing::error!(error = %e, "Data quality run failed");
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let rendered = match args.format {
        OutputFormat::Json => JsonFormatter::new().format(&run.report),
        OutputFormat::Human => HumanFormatter::new().format(&run.report),
    };
    match rendered {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    }

    if run.report.is_error() {
        ExitCode::from(2)
    } else if run.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
