//! CLI entry point for the HMCI pipeline.
//!
//! Provides subcommands for cleaning the raw datasets, computing the
//! confidence index, forecasting capacity, writing the market reports, or
//! running all stages in one go.

use anyhow::Result;
use clap::{Parser, Subcommand};
use hmci::config::PipelineConfig;
use hmci::output::print_json;
use hmci::pipeline::{
    DataPaths, RunReport, clean_all, load_cleaned, load_scores, run_all, run_forecast, run_index,
    run_reports,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "hmci")]
#[command(about = "Hydrogen Market Confidence Index pipeline", long_about = None)]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the raw input files
    #[arg(long, global = true, default_value = "data/raw")]
    raw_dir: PathBuf,

    /// Directory the cleaned and derived tables are written to
    #[arg(short, long, global = true, default_value = "data/processed")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and clean the raw datasets
    Clean,
    /// Compute project confidence scores from the cleaned tables
    Index,
    /// Forecast capacity from the cleaned projects and their scores
    Forecast,
    /// Write the regional demand, sector demand and cost-versus-breakeven reports
    Report,
    /// Run every stage over the raw inputs
    Run,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/hmci.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("hmci.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    let paths = DataPaths::new(cli.raw_dir, cli.out_dir);
    info!(
        raw_dir = %paths.raw_dir.display(),
        out_dir = %paths.out_dir.display(),
        imputation = ?config.imputation,
        "Configuration loaded"
    );

    let report = match cli.command {
        Commands::Run => run_all(&config, &paths)?,
        Commands::Clean => {
            let mut report = RunReport::start(&paths);
            clean_all(&config, &paths, &mut report)?;
            report.finish()
        }
        Commands::Index => {
            let mut report = RunReport::start(&paths);
            let tables = load_cleaned(&paths)?;
            run_index(&config, &paths, &tables, &mut report)?;
            report.finish()
        }
        Commands::Forecast => {
            let mut report = RunReport::start(&paths);
            let tables = load_cleaned(&paths)?;
            let scores = load_scores(&paths)?;
            run_forecast(&config, &paths, &tables.projects, &scores, &mut report)?;
            report.finish()
        }
        Commands::Report => {
            let mut report = RunReport::start(&paths);
            let tables = load_cleaned(&paths)?;
            run_reports(&config, &paths, &tables, &mut report)?;
            report.finish()
        }
    };

    print_json(&report)?;
    Ok(())
}
