//! In-memory store for testing.
//!
//! Provides a fast, non-persistent implementation of [`AggregateStore`] and
//! [`CursorStore`] for unit tests and embedding hosts that bring their own
//! persistence.

use crate::models::{AggregateRow, ErrorContext, ErrorRecord, IdentityHash, UpsertOutcome};
use crate::storage::sqlite::acquire_lock;
use crate::storage::traits::{AggregateStore, CursorStore};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory aggregate and cursor store.
///
/// A single `Mutex` guards each map, which makes every upsert atomic.
/// Write failures can be injected with [`fail_upserts_after`](Self::fail_upserts_after)
/// to exercise the engine's store-failure path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<IdentityHash, AggregateRow>>,
    cursors: Mutex<HashMap<String, u64>>,
    upsert_budget: Mutex<Option<usize>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upsert after the next `n` successful ones fail.
    pub fn fail_upserts_after(&self, n: usize) {
        *acquire_lock(&self.upsert_budget) = Some(n);
    }

    /// Removes any injected upsert failure.
    pub fn heal(&self) {
        *acquire_lock(&self.upsert_budget) = None;
    }

    fn take_upsert_budget(&self) -> Result<()> {
        let mut budget = acquire_lock(&self.upsert_budget);
        match budget.as_mut() {
            Some(0) => Err(Error::operation("upsert_aggregate", "injected failure")),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            },
            None => Ok(()),
        }
    }
}

impl AggregateStore for MemoryStore {
    fn upsert(
        &self,
        hash: &IdentityHash,
        record: &ErrorRecord,
        context: Option<&ErrorContext>,
        seen_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        self.take_upsert_budget()?;

        let mut rows = acquire_lock(&self.rows);
        if let Some(row) = rows.get_mut(hash) {
            row.occurrence_count += 1;
            row.last_seen = row.last_seen.max(seen_at);
            return Ok(UpsertOutcome::Incremented);
        }

        rows.insert(
            hash.clone(),
            AggregateRow {
                identity_hash: hash.clone(),
                severity: record.severity.clone(),
                message: record.message.clone(),
                source_file: record.source_file.clone(),
                source_line: record.source_line,
                occurrence_count: 1,
                first_seen: seen_at,
                last_seen: seen_at,
                context: context.cloned(),
            },
        );
        Ok(UpsertOutcome::Inserted)
    }

    fn get(&self, hash: &IdentityHash) -> Result<Option<AggregateRow>> {
        Ok(acquire_lock(&self.rows).get(hash).cloned())
    }

    fn list_by_last_seen(&self) -> Result<Vec<AggregateRow>> {
        let mut rows: Vec<AggregateRow> = acquire_lock(&self.rows).values().cloned().collect();
        rows.sort_by(|a, b| {
            b.last_seen
                .cmp(&a.last_seen)
                .then_with(|| a.identity_hash.cmp(&b.identity_hash))
        });
        Ok(rows)
    }

    fn clear(&self) -> Result<u64> {
        let mut rows = acquire_lock(&self.rows);
        let removed = rows.len() as u64;
        rows.clear();
        Ok(removed)
    }

    fn destroy(&self) -> Result<()> {
        acquire_lock(&self.rows).clear();
        Ok(())
    }
}

impl CursorStore for MemoryStore {
    fn read_cursor(&self, key: &str) -> Result<Option<u64>> {
        Ok(acquire_lock(&self.cursors).get(key).copied())
    }

    fn write_cursor(&self, key: &str, offset: u64) -> Result<()> {
        acquire_lock(&self.cursors).insert(key.to_string(), offset);
        Ok(())
    }

    fn delete_cursor(&self, key: &str) -> Result<bool> {
        Ok(acquire_lock(&self.cursors).remove(key).is_some())
    }
}
