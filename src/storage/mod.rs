//! Storage layer abstraction.
//!
//! Two contracts, both consumed by the ingestion engine:
//! - [`AggregateStore`]: keyed upsert of error aggregates, scan, clear, destroy
//! - [`CursorStore`]: named integer values surviving restarts (the log offset)
//!
//! [`SqliteStore`] implements both on one database file. [`MemoryStore`] is
//! the non-persistent counterpart used by tests.

// Allow significant_drop_tightening - holding the connection guard for a whole
// operation is intended.
#![allow(clippy::significant_drop_tightening)]
// Row counts never approach u64::MAX.
#![allow(clippy::cast_possible_truncation)]

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AggregateStore, CursorStore};
