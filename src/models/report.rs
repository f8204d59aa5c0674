//! Results returned by the witness entry points.

use serde::Serialize;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Lines that matched the grammar and were upserted.
    pub new_entries: u64,
    /// How many of those created a new aggregate row.
    pub new_identities: u64,
    /// Complete lines consumed, matched or not.
    pub lines_read: u64,
    /// Consumed lines that did not match the grammar.
    pub lines_skipped: u64,
    /// Effective offset the run started from (after rotation reconciliation).
    pub start_offset: u64,
    /// Offset persisted at the end of the run.
    pub end_offset: u64,
    /// Whether the stored cursor was reset because the file shrank.
    pub rotated: bool,
}

/// Snapshot of the witness state, for the `status` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WitnessStatus {
    /// Path of the tailed log.
    pub log_path: String,
    /// Current size of the log, `None` if it does not exist.
    pub file_size: Option<u64>,
    /// Stored cursor.
    pub cursor: u64,
    /// Bytes not yet ingested (0 when the file is missing or rotated).
    pub pending_bytes: u64,
    /// Number of aggregate rows.
    pub rows: u64,
    /// Sum of occurrence counts over all rows.
    pub occurrences: u64,
}
