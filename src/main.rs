//! Binary entry point for silent-witness.
//!
//! This binary provides the CLI interface for ingesting, exporting and
//! maintaining the deduplicated error aggregates.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use silent_witness::config::WitnessConfig;
use silent_witness::io::ExportFormat;
use silent_witness::observability;

/// Silent Witness - incremental PHP error-log deduplication.
#[derive(Parser)]
#[command(name = "silent-witness")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path of the tailed error log.
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Path of the aggregate database.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Installation root stripped from source file paths.
    #[arg(long, global = true)]
    root: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest lines appended since the last run.
    Ingest,

    /// Export all aggregates, most recently seen first.
    Export {
        /// Export format: json, ndjson, or csv (default: from output extension, else json).
        #[arg(short, long)]
        format: Option<ExportFormat>,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete all aggregates and reset the cursor to 0.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },

    /// Drop the aggregate store and delete the cursor.
    Destroy {
        /// Confirm the destruction.
        #[arg(long)]
        yes: bool,
    },

    /// Show log size, cursor position and aggregate totals.
    Status,

    /// Ingest periodically until interrupted.
    Watch {
        /// Seconds between runs (default: from config, 300).
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

/// Main entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let result = run_command(cli.command, config).await;

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: WitnessConfig) -> silent_witness::Result<ExitCode> {
    match command {
        Commands::Ingest => commands::cmd_ingest(&config),
        Commands::Export { format, output } => commands::cmd_export(&config, format, output),
        Commands::Clear { yes } => commands::cmd_clear(&config, yes),
        Commands::Destroy { yes } => commands::cmd_destroy(&config, yes),
        Commands::Status => commands::cmd_status(&config),
        Commands::Watch { interval } => commands::cmd_watch(&config, interval).await,
    }
}

/// Loads configuration and applies CLI overrides on top.
fn load_config(cli: &Cli) -> silent_witness::Result<WitnessConfig> {
    let mut config = WitnessConfig::load(cli.config.as_deref())?;

    if let Some(log) = &cli.log {
        config = config.with_log_path(log);
    }
    if let Some(db) = &cli.db {
        config = config.with_db_path(db);
    }
    if let Some(root) = &cli.root {
        config = config.with_root_prefix(root.as_str());
    }
    Ok(config)
}
