//! Persisted byte-offset bookmark into the tailed log.
//!
//! Rotation is detected purely by size shrinkage: if the log is now smaller
//! than the stored offset it was truncated or replaced, and reading restarts
//! at byte 0. A same-size replacement goes unnoticed.

use crate::Result;
use crate::storage::CursorStore;
use std::sync::Arc;

/// Default key under which the offset is stored.
pub const DEFAULT_CURSOR_KEY: &str = "silent_witness_log_offset";

/// Result of reconciling a stored offset against the current file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    /// Offset to seek to.
    pub effective_offset: u64,
    /// Whether the stored offset was discarded because the file shrank.
    pub rotated: bool,
}

/// Reconciles a stored offset with the current file size.
///
/// Re-reading a rotated file from the start can re-count lines that were
/// already ingested before the rotation; skipping new content is worse.
///
/// # Examples
///
/// ```rust
/// use silent_witness::services::reconcile;
///
/// assert_eq!(reconcile(100, 500).effective_offset, 100);
/// assert_eq!(reconcile(500, 500).effective_offset, 500);
///
/// let shrunk = reconcile(500, 120);
/// assert_eq!(shrunk.effective_offset, 0);
/// assert!(shrunk.rotated);
/// ```
#[must_use]
pub const fn reconcile(stored_offset: u64, current_file_size: u64) -> Reconciled {
    if current_file_size < stored_offset {
        Reconciled {
            effective_offset: 0,
            rotated: true,
        }
    } else {
        Reconciled {
            effective_offset: stored_offset,
            rotated: false,
        }
    }
}

/// Offset cursor bound to one log source.
#[derive(Clone)]
pub struct OffsetCursor {
    store: Arc<dyn CursorStore>,
    key: String,
}

impl OffsetCursor {
    /// Creates a cursor stored under `key` in `store`.
    pub fn new(store: Arc<dyn CursorStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Returns the storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the stored offset; a cursor that was never written reads as 0.
    pub fn read(&self) -> Result<u64> {
        Ok(self.store.read_cursor(&self.key)?.unwrap_or(0))
    }

    /// Persists `offset`.
    pub fn write(&self, offset: u64) -> Result<()> {
        self.store.write_cursor(&self.key, offset)
    }

    /// Resets the cursor to 0.
    pub fn reset(&self) -> Result<()> {
        self.write(0)
    }

    /// Removes the cursor from storage entirely.
    pub fn delete(&self) -> Result<bool> {
        self.store.delete_cursor(&self.key)
    }

    /// Reads the stored offset and reconciles it with `current_file_size`.
    ///
    /// Does not write anything; the engine persists the final position.
    pub fn reconcile(&self, current_file_size: u64) -> Result<Reconciled> {
        Ok(reconcile(self.read()?, current_file_size))
    }
}

impl std::fmt::Debug for OffsetCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetCursor")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
