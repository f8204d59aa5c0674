//! Core command handlers: ingest and status.

use std::process::ExitCode;

use silent_witness::config::WitnessConfig;
use silent_witness::{Result, WitnessService};

/// Ingest command.
///
/// Prints the number of new entries. Any error, including a missing log,
/// exits non-zero.
pub fn cmd_ingest(config: &WitnessConfig) -> Result<ExitCode> {
    let service = WitnessService::from_config(config)?;
    let report = service.ingest()?;

    println!("{} new entries", report.new_entries);
    if report.rotated {
        println!("Log rotation detected; re-read from the start");
    }
    Ok(ExitCode::SUCCESS)
}

/// Status command.
pub fn cmd_status(config: &WitnessConfig) -> Result<ExitCode> {
    let service = WitnessService::from_config(config)?;
    let status = service.status()?;

    println!("Silent Witness Status");
    println!("=====================");
    println!("Log:          {}", status.log_path);
    match status.file_size {
        Some(size) => println!("Log size:     {size} bytes"),
        None => println!("Log size:     (missing)"),
    }
    println!("Cursor:       {}", status.cursor);
    println!("Pending:      {} bytes", status.pending_bytes);
    println!("Database:     {}", config.db_path().display());
    println!("Aggregates:   {}", status.rows);
    println!("Occurrences:  {}", status.occurrences);

    Ok(ExitCode::SUCCESS)
}
