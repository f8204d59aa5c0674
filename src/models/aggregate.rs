//! Aggregate rows and their identity keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deduplication key of an error: a fixed-width lowercase hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityHash(String);

impl IdentityHash {
    /// Wraps an already computed digest.
    #[must_use]
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Returns the digest as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IdentityHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Request-level side payload captured at first sight of an error.
///
/// Only hosts that intercept errors live can fill this in. The log tailer
/// never has it and always upserts with `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Request URI, or `"CLI"` outside a web request.
    pub request_path: String,
    /// HTTP method, or `"N/A"`.
    pub method: String,
    /// Acting user id, 0 when anonymous.
    pub actor_id: u64,
    /// Tenant/site id on multi-site installations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<u64>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            request_path: "CLI".to_string(),
            method: "N/A".to_string(),
            actor_id: 0,
            site_id: None,
        }
    }
}

/// One persisted row per unique error identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// Primary key.
    pub identity_hash: IdentityHash,
    /// Severity of the first occurrence.
    pub severity: String,
    /// Message of the first occurrence (already truncated).
    pub message: String,
    /// Source file of the first occurrence.
    pub source_file: String,
    /// Source line of the first occurrence.
    pub source_line: u32,
    /// Number of ingested occurrences, starting at 1.
    pub occurrence_count: u64,
    /// When the row was created.
    pub first_seen: DateTime<Utc>,
    /// When the row was last incremented.
    pub last_seen: DateTime<Utc>,
    /// Optional first-seen request context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

/// What an upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new row was created with `occurrence_count = 1`.
    Inserted,
    /// An existing row's count was incremented.
    Incremented,
}
