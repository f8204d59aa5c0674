//! Command handlers module.
//!
//! - `core.rs`: ingest and status
//! - `io.rs`: export
//! - `maintenance.rs`: clear and destroy
//! - `watch.rs`: the periodic ingestion loop

mod core;
mod io;
mod maintenance;
mod watch;

// Re-export command functions
pub use core::{cmd_ingest, cmd_status};
pub use io::cmd_export;
pub use maintenance::{cmd_clear, cmd_destroy};
pub use watch::cmd_watch;
