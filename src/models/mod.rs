//! Data models for silent-witness.
//!
//! This module contains the core data structures shared by the parser, the
//! hasher, the ingestion engine, and the storage backends.

mod aggregate;
mod record;
mod report;

pub use aggregate::{AggregateRow, ErrorContext, IdentityHash, UpsertOutcome};
pub use record::{ErrorRecord, MAX_MESSAGE_CHARS, truncate_chars};
pub use report::{IngestReport, WitnessStatus};
