//! Metric names.
//!
//! Counters are emitted through the `metrics` facade. No recorder is
//! installed by this crate; without one every emission is a no-op.

/// Matching lines upserted.
pub const LINES_INGESTED_TOTAL: &str = "witness_lines_ingested_total";

/// Consumed lines that did not match the grammar.
pub const LINES_SKIPPED_TOTAL: &str = "witness_lines_skipped_total";

/// Ingestion runs that found the log shrunk below the stored cursor.
pub const ROTATIONS_TOTAL: &str = "witness_rotations_total";

/// Confirmed `clear` calls.
pub const CLEAR_TOTAL: &str = "witness_clear_total";

/// Confirmed `destroy` calls.
pub const DESTROY_TOTAL: &str = "witness_destroy_total";

/// Store calls, labelled by backend, operation and status.
pub const STORAGE_OPERATIONS_TOTAL: &str = "storage_operations_total";

/// Store call latency histogram, labelled by backend and operation.
pub const STORAGE_OPERATION_DURATION_MS: &str = "storage_operation_duration_ms";
