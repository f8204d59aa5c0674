//! # Silent Witness
//!
//! Incremental error-log deduplication.
//!
//! Silent Witness tails a continuously appended (and periodically rotated) PHP
//! error log, extracts structured error records from the free-form lines, and
//! folds repeated occurrences into one aggregate row per error identity with a
//! running count. The same warning fired ten thousand times becomes one row
//! with `occurrence_count = 10000` instead of ten thousand log lines.
//!
//! ## Pipeline
//!
//! ```text
//! cursor ──seek──▶ raw lines ──▶ LineParser ──▶ ErrorRecord ──▶ IdentityHasher
//!                                                                    │
//!            persisted cursor ◀── byte position ◀── AggregateStore::upsert
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use silent_witness::{LineParser, SqliteStore, WitnessService};
//!
//! let store = Arc::new(SqliteStore::new("witness.db")?);
//! let service = WitnessService::new(
//!     "/var/log/php/error.log",
//!     LineParser::new().with_root_prefix("/var/www/site/"),
//!     store.clone(),
//!     store,
//! );
//! let report = service.ingest()?;
//! println!("{} new entries", report.new_entries);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod parser;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::WitnessConfig;
pub use models::{AggregateRow, ErrorContext, ErrorRecord, IdentityHash, IngestReport};
pub use parser::LineParser;
pub use services::{Confirmation, IdentityHasher, IngestionEngine, OffsetCursor, WitnessService};
pub use storage::{AggregateStore, CursorStore, MemoryStore, SqliteStore};

/// Error type for silent-witness operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `SourceNotFound` | The tailed log file does not exist (yet) |
/// | `SourceUnreadable` | The log exists but cannot be opened, sized, or read |
/// | `StoreWriteFailure` | An upsert did not apply; the cursor stops before that line |
/// | `ConfirmationRequired` | `clear`/`destroy` invoked without explicit confirmation |
/// | `InvalidInput` | Bad configuration values, unknown export formats |
/// | `OperationFailed` | Any other storage or I/O failure |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The log source does not exist.
    ///
    /// Recoverable: it simply means there is nothing to ingest yet. No state
    /// is mutated when this is returned.
    #[error("log source not found: {path}")]
    SourceNotFound {
        /// Path that was looked up.
        path: String,
    },

    /// The log source exists but could not be opened or read.
    #[error("log source unreadable: {path}: {cause}")]
    SourceUnreadable {
        /// Path of the log source.
        path: String,
        /// The underlying OS error.
        cause: String,
    },

    /// An aggregate upsert did not apply.
    ///
    /// `byte_offset` is the position of the start of the line whose upsert
    /// failed. The persisted cursor never moves past it.
    #[error("store write failed for {identity_hash} at byte {byte_offset}: {cause}")]
    StoreWriteFailure {
        /// Identity hash of the record that failed to upsert.
        identity_hash: String,
        /// Byte offset of the start of the failed line.
        byte_offset: u64,
        /// The underlying cause.
        cause: String,
    },

    /// A destructive operation was invoked without confirmation.
    #[error("'{operation}' is destructive and requires explicit confirmation")]
    ConfirmationRequired {
        /// The operation that was refused.
        operation: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Returns true if the error means "nothing to do yet" rather than a fault.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::SourceNotFound { .. })
    }
}

/// Result type alias for silent-witness operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::SourceNotFound {
            path: "/var/log/php.log".to_string(),
        };
        assert_eq!(err.to_string(), "log source not found: /var/log/php.log");

        let err = Error::StoreWriteFailure {
            identity_hash: "abc".to_string(),
            byte_offset: 42,
            cause: "disk full".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "store write failed for abc at byte 42: disk full"
        );

        let err = Error::ConfirmationRequired {
            operation: "destroy".to_string(),
        };
        assert!(err.to_string().contains("destroy"));

        let err = Error::operation("open_sqlite", "locked");
        assert_eq!(err.to_string(), "operation 'open_sqlite' failed: locked");
    }

    #[test]
    fn test_only_missing_source_is_recoverable() {
        assert!(
            Error::SourceNotFound {
                path: String::new()
            }
            .is_recoverable()
        );
        assert!(
            !Error::SourceUnreadable {
                path: String::new(),
                cause: String::new()
            }
            .is_recoverable()
        );
    }
}
