//! Business logic services.
//!
//! Services orchestrate the parser and storage backends and provide the
//! high-level operations exposed to hosts and the CLI.

mod cursor;
mod identity;
mod ingest;
mod witness;

pub use cursor::{DEFAULT_CURSOR_KEY, OffsetCursor, Reconciled, reconcile};
pub use identity::{IDENTITY_HASH_LEN, IdentityHasher};
pub use ingest::IngestionEngine;
pub use witness::{Confirmation, WitnessService};
