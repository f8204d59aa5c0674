//! Shared connection handling for the `SQLite` store.
//!
//! Mutex acquisition with poison recovery, and the pragmas every connection
//! gets before first use.

use crate::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Busy timeout applied to every connection, in milliseconds.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Helper to acquire mutex lock with poison recovery.
///
/// If the mutex is poisoned (a previous holder panicked), the inner value is
/// recovered and a warning is logged. The connection itself stays valid.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Opens a database file, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the directory or database cannot be created.
pub fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_db_dir".to_string(),
            cause: format!("{}: {e}", parent.display()),
        })?;
    }

    Connection::open(path).map_err(|e| Error::OperationFailed {
        operation: "open_sqlite".to_string(),
        cause: format!("{}: {e}", path.display()),
    })
}

/// Configures a connection for concurrent use by several processes.
///
/// - **WAL mode**: concurrent readers with a single writer
/// - **NORMAL synchronous**: durability/performance balance
/// - **`busy_timeout`**: wait for competing writers instead of failing with `SQLITE_BUSY`
///
/// A scheduled ingest and a manual one may hit the same database file at the
/// same time; the busy timeout turns that into a short wait.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the busy timeout cannot be applied.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // Busy timeout first so the journal mode switch itself can wait on other writers
    conn.busy_timeout(std::time::Duration::from_millis(u64::from(BUSY_TIMEOUT_MS)))
        .map_err(|e| Error::OperationFailed {
            operation: "configure_connection".to_string(),
            cause: e.to_string(),
        })?;
    // journal_mode returns a row ("wal" or "memory"), so the result is ignored
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");

    Ok(())
}
