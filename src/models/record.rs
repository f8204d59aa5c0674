//! Structured error records extracted from log lines.

use serde::{Deserialize, Serialize};

/// Default upper bound on stored message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// One error occurrence as parsed from a log line.
///
/// Field values are compared verbatim by the identity hasher, so the message
/// must already be truncated when a record reaches the hasher or the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Level token as emitted by the log producer ("Warning", "Fatal error", ...).
    pub severity: String,
    /// Free-text description, at most [`MAX_MESSAGE_CHARS`] characters.
    pub message: String,
    /// Source path with the installation root stripped.
    pub source_file: String,
    /// 1-based line number within `source_file`.
    pub source_line: u32,
}

impl ErrorRecord {
    /// Creates a record, truncating the message to [`MAX_MESSAGE_CHARS`].
    #[must_use]
    pub fn new(
        severity: impl Into<String>,
        message: &str,
        source_file: impl Into<String>,
        source_line: u32,
    ) -> Self {
        Self {
            severity: severity.into(),
            message: truncate_chars(message, MAX_MESSAGE_CHARS).to_string(),
            source_file: source_file.into(),
            source_line,
        }
    }
}

/// Returns the longest prefix of `s` holding at most `max_chars` characters.
///
/// Cuts on a character boundary, never inside a multi-byte sequence.
///
/// # Examples
///
/// ```rust
/// use silent_witness::models::truncate_chars;
///
/// assert_eq!(truncate_chars("héllo", 2), "hé");
/// assert_eq!(truncate_chars("short", 100), "short");
/// ```
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}
