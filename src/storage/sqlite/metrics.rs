//! Shared metrics recording for storage backends.

use crate::observability::{STORAGE_OPERATION_DURATION_MS, STORAGE_OPERATIONS_TOTAL};
use std::time::Instant;

/// Records operation metrics for a storage call.
///
/// Emits `storage_operations_total` (counter) and
/// `storage_operation_duration_ms` (histogram), both labelled by backend,
/// operation and status.
///
/// ```ignore
/// let start = Instant::now();
/// let result = do_upsert();
/// let status = if result.is_ok() { "success" } else { "error" };
/// record_operation_metrics("sqlite", "upsert", start, status);
/// ```
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        STORAGE_OPERATIONS_TOTAL,
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        STORAGE_OPERATION_DURATION_MS,
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Maps a result to the status label used by [`record_operation_metrics`].
pub const fn status_label<T, E>(result: &std::result::Result<T, E>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}
