//! Aggregate store trait.

use crate::Result;
use crate::models::{AggregateRow, ErrorContext, ErrorRecord, IdentityHash, UpsertOutcome};
use chrono::{DateTime, Utc};

/// Trait for aggregate storage backends.
///
/// The aggregate store keeps one row per error identity. Its central
/// operation is [`upsert`](Self::upsert), which must be atomic per row under
/// concurrent callers sharing the same store: manual and scheduled ingestion
/// runs may race on the same identities.
pub trait AggregateStore: Send + Sync {
    /// Inserts a new row or increments an existing one.
    ///
    /// - No row for `hash`: creates one with `occurrence_count = 1` and
    ///   `first_seen = last_seen = seen_at`, storing `context` if given.
    /// - Row exists: increments `occurrence_count` by exactly 1 and moves
    ///   `last_seen` forward to `seen_at` (never backwards). Content fields and context of the existing
    ///   row are left untouched (first write wins).
    fn upsert(
        &self,
        hash: &IdentityHash,
        record: &ErrorRecord,
        context: Option<&ErrorContext>,
        seen_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome>;

    /// Retrieves a row by identity hash.
    fn get(&self, hash: &IdentityHash) -> Result<Option<AggregateRow>>;

    /// Returns all rows ordered by `last_seen` descending.
    ///
    /// Ties are broken by identity hash ascending so output is stable.
    fn list_by_last_seen(&self) -> Result<Vec<AggregateRow>>;

    /// Deletes every row, returning how many were removed.
    fn clear(&self) -> Result<u64>;

    /// Drops the store's schema entirely.
    ///
    /// Irreversible. Backends may re-provision the schema on the next write.
    fn destroy(&self) -> Result<()>;

    /// Returns the number of rows.
    fn count(&self) -> Result<u64> {
        Ok(self.list_by_last_seen()?.len() as u64)
    }

    /// Returns the sum of occurrence counts over all rows.
    fn total_occurrences(&self) -> Result<u64> {
        Ok(self
            .list_by_last_seen()?
            .iter()
            .map(|row| row.occurrence_count)
            .sum())
    }
}
