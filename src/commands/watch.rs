//! Periodic ingestion loop.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use silent_witness::config::WitnessConfig;
use silent_witness::{Error, Result, WitnessService};
use tracing::{debug, error, info};

/// Watch command.
///
/// Runs one ingestion immediately, then every `interval` seconds until
/// Ctrl-C. Failed runs are logged and the loop continues.
pub async fn cmd_watch(config: &WitnessConfig, interval: Option<u64>) -> Result<ExitCode> {
    let secs = interval.unwrap_or(config.watch_interval_secs);
    if secs == 0 {
        return Err(Error::InvalidInput("--interval must be at least 1".to_string()));
    }
    let log_path = config.require_log_path()?;

    let service = Arc::new(WitnessService::from_config(config)?);
    info!(
        log_path = %log_path.display(),
        interval_secs = secs,
        "Watching log"
    );

    watch_until(service, Duration::from_secs(secs), tokio::signal::ctrl_c()).await;
    Ok(ExitCode::SUCCESS)
}

/// Ingests on every tick until `shutdown` resolves; returns the number of
/// completed runs.
///
/// `shutdown` is polled during runs as well, so an interrupt is never lost.
/// A run that is already in flight is left to finish on the blocking pool.
async fn watch_until<S: Future>(
    service: Arc<WitnessService>,
    period: Duration,
    shutdown: S,
) -> u64 {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut runs = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {},
            _ = &mut shutdown => break,
        }
        tokio::select! {
            () = run_once(Arc::clone(&service)) => runs += 1,
            _ = &mut shutdown => break,
        }
    }

    info!(runs, "Interrupted, stopping watch loop");
    runs
}

async fn run_once(service: Arc<WitnessService>) {
    let outcome = tokio::task::spawn_blocking(move || service.ingest()).await;
    match outcome {
        Ok(Ok(report)) => {
            if report.new_entries > 0 || report.rotated {
                println!("{} new entries", report.new_entries);
            }
        },
        Ok(Err(e)) if e.is_recoverable() => debug!(error = %e, "Nothing to ingest yet"),
        Ok(Err(e)) => error!(error = %e, "Ingestion run failed"),
        Err(e) => error!(error = %e, "Ingestion task panicked"),
    }
}
