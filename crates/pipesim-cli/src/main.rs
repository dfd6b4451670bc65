//! pipesim — deterministic build/test pipeline simulator CLI.
//!
//! ## Commands
//!
//! - `run`: execute the configured pipeline and write run artifacts
//! - `validate`: check a configuration without running anything
//! - `explain`: print the plan a run would follow
//!
//! Exit codes: 0 success, 1 one or more test failures, 2 configuration
//! error (after printing a structured `{"error":"config_error",...}` line).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pipesim_core::{
    explain, validate, write_reports, ConfigDocument, ConfigError, PipelineExecutor,
};
use tracing::Level;

const EXIT_OK: u8 = 0;
const EXIT_TEST_FAILURES: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
// Infrastructure failures (unwritable output directory and the like) get
// their own code so dashboards can tell them apart from test failures.
const EXIT_REPORT_ERROR: u8 = 3;

#[derive(Parser)]
#[command(name = "pipesim")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic build-then-test pipeline simulator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the pipeline and write run artifacts
    Run {
        /// YAML pipeline configuration
        #[arg(long)]
        config: PathBuf,

        /// Output directory for artifacts and logs
        #[arg(long, value_name = "DIR")]
        out: PathBuf,

        /// Validate only; write header-only/empty artifacts
        #[arg(long)]
        dry: bool,
    },

    /// Validate a configuration and print OK
    Validate {
        /// YAML pipeline configuration
        #[arg(long)]
        config: PathBuf,
    },

    /// Print the plan a run would follow
    Explain {
        /// YAML pipeline configuration
        #[arg(long)]
        config: PathBuf,

        /// Include each module's precomputed digest
        #[arg(long)]
        digests: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    pipesim_core::logging::init_tracing(cli.json, level);

    let code = match cli.command {
        Commands::Run { config, out, dry } => cmd_run(&config, &out, dry).await,
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Explain { config, digests } => cmd_explain(&config, digests),
    };
    ExitCode::from(code)
}

/// Print the structured diagnostic line for a configuration error.
fn report_config_error(err: &ConfigError) -> u8 {
    let line = serde_json::json!({
        "error": "config_error",
        "message": err.to_string(),
    });
    println!("{line}");
    EXIT_CONFIG_ERROR
}

async fn cmd_run(config: &Path, out: &Path, dry: bool) -> u8 {
    let doc = match ConfigDocument::from_path(config) {
        Ok(doc) => doc,
        Err(err) => return report_config_error(&err),
    };

    let outcome = match PipelineExecutor::execute(&doc, dry).await {
        Ok(outcome) => outcome,
        Err(err) => return report_config_error(&err),
    };

    if let Err(err) = write_reports(out, &outcome.result, &outcome.telemetry) {
        eprintln!("error: {err:#}");
        return EXIT_REPORT_ERROR;
    }

    if outcome.result.failures > 0 {
        EXIT_TEST_FAILURES
    } else {
        EXIT_OK
    }
}

fn cmd_validate(config: &Path) -> u8 {
    let outcome = ConfigDocument::from_path(config).and_then(|doc| validate(&doc));
    match outcome {
        Ok(()) => {
            println!("OK");
            EXIT_OK
        }
        Err(err) => report_config_error(&err),
    }
}

fn cmd_explain(config: &Path, digests: bool) -> u8 {
    let doc = match ConfigDocument::from_path(config) {
        Ok(doc) => doc,
        Err(err) => return report_config_error(&err),
    };

    let plan = explain(&doc, digests);
    match serde_json::to_string_pretty(&plan) {
        Ok(text) => {
            println!("{text}");
            EXIT_OK
        }
        Err(err) => {
            eprintln!("error: {err}");
            EXIT_REPORT_ERROR
        }
    }
}
