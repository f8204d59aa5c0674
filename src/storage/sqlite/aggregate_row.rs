//! Row conversion for the `error_aggregates` table.

use crate::models::{AggregateRow, ErrorContext, IdentityHash};
use chrono::{DateTime, Utc};

/// Column list shared by every `SELECT` on `error_aggregates`.
///
/// Column order matches [`RawAggregateRow::from_row`].
pub const AGGREGATE_COLUMNS: &str = "identity_hash, severity, message, source_file, source_line, \
     occurrence_count, first_seen, last_seen, context";

/// A row exactly as `SQLite` stores it.
///
/// Timestamps are Unix seconds, the context is JSON text.
#[derive(Debug)]
pub struct RawAggregateRow {
    /// Primary key.
    pub identity_hash: String,
    /// Severity label.
    pub severity: String,
    /// Truncated message.
    pub message: String,
    /// Root-relative source file.
    pub source_file: String,
    /// Source line.
    pub source_line: i64,
    /// Occurrence count.
    pub occurrence_count: i64,
    /// First-seen Unix seconds.
    pub first_seen: i64,
    /// Last-seen Unix seconds.
    pub last_seen: i64,
    /// JSON-encoded [`ErrorContext`], if any.
    pub context: Option<String>,
}

impl RawAggregateRow {
    /// Reads a row selected with [`AGGREGATE_COLUMNS`].
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            identity_hash: row.get(0)?,
            severity: row.get(1)?,
            message: row.get(2)?,
            source_file: row.get(3)?,
            source_line: row.get(4)?,
            occurrence_count: row.get(5)?,
            first_seen: row.get(6)?,
            last_seen: row.get(7)?,
            context: row.get(8)?,
        })
    }
}

/// Converts a stored row into the domain type.
///
/// Out-of-range integers clamp to 0 and unparseable context JSON is dropped
/// with a warning rather than failing the whole scan.
#[must_use]
pub fn build_aggregate_from_row(raw: RawAggregateRow) -> AggregateRow {
    let context = raw.context.and_then(|json| {
        serde_json::from_str::<ErrorContext>(&json)
            .map_err(|e| {
                tracing::warn!(
                    identity_hash = %raw.identity_hash,
                    error = %e,
                    "Discarding malformed context payload"
                );
            })
            .ok()
    });

    AggregateRow {
        identity_hash: IdentityHash::new(raw.identity_hash),
        severity: raw.severity,
        message: raw.message,
        source_file: raw.source_file,
        source_line: u32::try_from(raw.source_line).unwrap_or(0),
        occurrence_count: u64::try_from(raw.occurrence_count).unwrap_or(0),
        first_seen: timestamp_to_datetime(raw.first_seen),
        last_seen: timestamp_to_datetime(raw.last_seen),
        context,
    }
}

/// Converts Unix seconds to a UTC datetime, falling back to the epoch.
#[must_use]
pub fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
