//! `SQLite` storage backend.
//!
//! - [`connection`]: lock acquisition with poison recovery, pragmas
//! - [`aggregate_row`]: conversion between table rows and [`AggregateRow`](crate::AggregateRow)
//! - [`metrics`]: per-operation metrics recording
//! - [`store`]: [`SqliteStore`], implementing both storage traits

mod aggregate_row;
mod connection;
mod metrics;
mod store;

pub use aggregate_row::{RawAggregateRow, build_aggregate_from_row, timestamp_to_datetime};
pub use connection::{BUSY_TIMEOUT_MS, acquire_lock, configure_connection, open_connection};
pub use metrics::{record_operation_metrics, status_label};
pub use store::SqliteStore;
