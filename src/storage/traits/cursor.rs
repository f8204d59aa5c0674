//! Cursor store trait.

use crate::Result;

/// Durable storage for named integer values surviving process restarts.
///
/// Used to persist the byte offset of the tailed log. No locking is implied:
/// a read-modify-write across two concurrent runs can lose one run's update.
pub trait CursorStore: Send + Sync {
    /// Reads the value stored under `key`, `None` if never written.
    fn read_cursor(&self, key: &str) -> Result<Option<u64>>;

    /// Writes `offset` under `key`, creating or replacing it.
    fn write_cursor(&self, key: &str, offset: u64) -> Result<()>;

    /// Deletes the value under `key`, returning whether it existed.
    fn delete_cursor(&self, key: &str) -> Result<bool>;
}
