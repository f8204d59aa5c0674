//! `SQLite`-backed aggregate and cursor store.
//!
//! One database file holds both the `error_aggregates` table and the
//! `witness_state` key/value table used for the log cursor.

use super::aggregate_row::{AGGREGATE_COLUMNS, RawAggregateRow, build_aggregate_from_row};
use super::connection::{acquire_lock, configure_connection, open_connection};
use super::metrics::{record_operation_metrics, status_label};
use crate::models::{AggregateRow, ErrorContext, ErrorRecord, IdentityHash, UpsertOutcome};
use crate::storage::traits::{AggregateStore, CursorStore};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "sqlite";

const CREATE_AGGREGATES: &str = "CREATE TABLE IF NOT EXISTS error_aggregates (
        identity_hash TEXT PRIMARY KEY,
        severity TEXT NOT NULL,
        message TEXT NOT NULL,
        source_file TEXT NOT NULL,
        source_line INTEGER NOT NULL,
        occurrence_count INTEGER NOT NULL DEFAULT 1,
        first_seen INTEGER NOT NULL,
        last_seen INTEGER NOT NULL,
        context TEXT
    )";

const CREATE_LAST_SEEN_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_error_aggregates_last_seen
        ON error_aggregates(last_seen DESC)";

const CREATE_STATE: &str = "CREATE TABLE IF NOT EXISTS witness_state (
        key TEXT PRIMARY KEY,
        value INTEGER NOT NULL
    )";

// Single statement: the insert-or-increment is atomic per row even when
// several processes share the database file.
const UPSERT: &str = "INSERT INTO error_aggregates
        (identity_hash, severity, message, source_file, source_line,
         occurrence_count, first_seen, last_seen, context)
     VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6, ?7)
     ON CONFLICT(identity_hash) DO UPDATE SET
        occurrence_count = occurrence_count + 1,
        last_seen = max(last_seen, excluded.last_seen)
     RETURNING occurrence_count";

/// `SQLite` store implementing both [`AggregateStore`] and [`CursorStore`].
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for in-process access. Across processes,
/// WAL mode and `busy_timeout` serialize writers; the upsert is a single
/// `INSERT .. ON CONFLICT DO UPDATE` statement, so racing ingestion runs
/// never lose an increment.
///
/// # Schema lifecycle
///
/// The schema is provisioned on open. [`destroy`](AggregateStore::destroy)
/// drops the aggregate table; the next operation re-provisions it. Every
/// operation compares `PRAGMA schema_version` with the version recorded at
/// the last provisioning, so a table dropped through another handle or
/// process is recreated too.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    provisioned_version: AtomicI64,
}

// Never a real schema_version, which starts at 0.
const UNPROVISIONED: i64 = -1;

impl SqliteStore {
    /// Opens (or creates) a store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = open_connection(&db_path)?;
        Self::from_connection(conn, Some(db_path))
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_sqlite_in_memory".to_string(),
            cause: e.to_string(),
        })?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        configure_connection(&conn)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            provisioned_version: AtomicI64::new(UNPROVISIONED),
        };
        store.with_conn(|_| Ok(()))?;
        Ok(store)
    }

    /// Returns the database path (`None` for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Runs `f` with the locked connection, provisioning the schema first if
    /// it changed since the last provisioning.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = acquire_lock(&self.conn);
        if schema_version(&conn)? != self.provisioned_version.load(Ordering::Acquire) {
            Self::provision(&conn)?;
            self.provisioned_version
                .store(schema_version(&conn)?, Ordering::Release);
        }
        f(&conn)
    }

    fn provision(conn: &Connection) -> Result<()> {
        for (operation, sql) in [
            ("create_aggregates_table", CREATE_AGGREGATES),
            ("create_last_seen_index", CREATE_LAST_SEEN_INDEX),
            ("create_state_table", CREATE_STATE),
        ] {
            conn.execute(sql, [])
                .map_err(|e| Error::operation(operation, e))?;
        }
        Ok(())
    }
}

fn schema_version(conn: &Connection) -> Result<i64> {
    conn.pragma_query_value(None, "schema_version", |row| row.get(0))
        .map_err(|e| Error::operation("read_schema_version", e))
}

fn offset_to_sql(offset: u64) -> Result<i64> {
    i64::try_from(offset)
        .map_err(|_| Error::InvalidInput(format!("cursor offset {offset} exceeds i64 range")))
}

impl AggregateStore for SqliteStore {
    #[instrument(skip(self, record, context), fields(operation = "upsert", backend = BACKEND, identity_hash = %hash))]
    fn upsert(
        &self,
        hash: &IdentityHash,
        record: &ErrorRecord,
        context: Option<&ErrorContext>,
        seen_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        let start = Instant::now();
        let result = self.with_conn(|conn| {
            let context_json = context
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| Error::operation("serialize_context", e))?;

            let count: i64 = conn
                .query_row(
                    UPSERT,
                    params![
                        hash.as_str(),
                        record.severity,
                        record.message,
                        record.source_file,
                        i64::from(record.source_line),
                        seen_at.timestamp(),
                        context_json,
                    ],
                    |row| row.get(0),
                )
                .map_err(|e| Error::operation("upsert_aggregate", e))?;

            Ok(if count <= 1 {
                UpsertOutcome::Inserted
            } else {
                UpsertOutcome::Incremented
            })
        });

        record_operation_metrics(BACKEND, "upsert", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "get", backend = BACKEND, identity_hash = %hash))]
    fn get(&self, hash: &IdentityHash) -> Result<Option<AggregateRow>> {
        let start = Instant::now();
        let result = self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {AGGREGATE_COLUMNS} FROM error_aggregates WHERE identity_hash = ?1"),
                params![hash.as_str()],
                RawAggregateRow::from_row,
            )
            .optional()
            .map(|raw| raw.map(build_aggregate_from_row))
            .map_err(|e| Error::operation("get_aggregate", e))
        });

        record_operation_metrics(BACKEND, "get", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "list", backend = BACKEND))]
    fn list_by_last_seen(&self) -> Result<Vec<AggregateRow>> {
        let start = Instant::now();
        let result = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {AGGREGATE_COLUMNS} FROM error_aggregates
                     ORDER BY last_seen DESC, identity_hash ASC"
                ))
                .map_err(|e| Error::operation("prepare_list_aggregates", e))?;

            let rows = stmt
                .query_map([], RawAggregateRow::from_row)
                .map_err(|e| Error::operation("list_aggregates", e))?;

            rows.map(|raw| {
                raw.map(build_aggregate_from_row)
                    .map_err(|e| Error::operation("read_aggregate_row", e))
            })
            .collect()
        });

        record_operation_metrics(BACKEND, "list", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "clear", backend = BACKEND))]
    fn clear(&self) -> Result<u64> {
        let start = Instant::now();
        let result = self.with_conn(|conn| {
            conn.execute("DELETE FROM error_aggregates", [])
                .map(|n| n as u64)
                .map_err(|e| Error::operation("clear_aggregates", e))
        });

        record_operation_metrics(BACKEND, "clear", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "destroy", backend = BACKEND))]
    fn destroy(&self) -> Result<()> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            conn.execute("DROP TABLE IF EXISTS error_aggregates", [])
                .map(|_| self.provisioned_version.store(UNPROVISIONED, Ordering::Release))
                .map_err(|e| Error::operation("drop_aggregates", e))
        };

        record_operation_metrics(BACKEND, "destroy", start, status_label(&result));
        result
    }

    fn count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM error_aggregates", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| u64::try_from(n).unwrap_or(0))
            .map_err(|e| Error::operation("count_aggregates", e))
        })
    }

    fn total_occurrences(&self) -> Result<u64> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(occurrence_count), 0) FROM error_aggregates",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| u64::try_from(n).unwrap_or(0))
            .map_err(|e| Error::operation("sum_occurrences", e))
        })
    }
}

impl CursorStore for SqliteStore {
    #[instrument(skip(self), fields(operation = "read_cursor", backend = BACKEND))]
    fn read_cursor(&self, key: &str) -> Result<Option<u64>> {
        self.with_conn(|conn| {
            let value: Option<i64> = conn
                .query_row(
                    "SELECT value FROM witness_state WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| Error::operation("read_cursor", e))?;

            Ok(value.map(|v| u64::try_from(v).unwrap_or(0)))
        })
    }

    #[instrument(skip(self), fields(operation = "write_cursor", backend = BACKEND))]
    fn write_cursor(&self, key: &str, offset: u64) -> Result<()> {
        let value = offset_to_sql(offset)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO witness_state (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map(|_| ())
            .map_err(|e| Error::operation("write_cursor", e))
        })
    }

    #[instrument(skip(self), fields(operation = "delete_cursor", backend = BACKEND))]
    fn delete_cursor(&self, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM witness_state WHERE key = ?1", params![key])
                .map(|n| n > 0)
                .map_err(|e| Error::operation("delete_cursor", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::IdentityHasher;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::thread;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn record(message: &str) -> (IdentityHash, ErrorRecord) {
        let record = ErrorRecord::new("Warning", message, "wp-content/a.php", 10);
        (IdentityHasher::hash(&record), record)
    }

    #[test]
    fn test_first_upsert_inserts_with_count_one() {
        let store = SqliteStore::in_memory().unwrap();
        let (hash, rec) = record("boom");

        let outcome = store.upsert(&hash, &rec, None, at(100)).unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let row = store.get(&hash).unwrap().unwrap();
        assert_eq!(row.occurrence_count, 1);
        assert_eq!(row.first_seen, at(100));
        assert_eq!(row.last_seen, at(100));
        assert_eq!(row.message, "boom");
    }

    #[test]
    fn test_repeat_upsert_increments_and_refreshes_last_seen() {
        let store = SqliteStore::in_memory().unwrap();
        let (hash, rec) = record("boom");

        store.upsert(&hash, &rec, None, at(100)).unwrap();
        let outcome = store.upsert(&hash, &rec, None, at(250)).unwrap();
        assert_eq!(outcome, UpsertOutcome::Incremented);

        let row = store.get(&hash).unwrap().unwrap();
        assert_eq!(row.occurrence_count, 2);
        assert_eq!(row.first_seen, at(100));
        assert_eq!(row.last_seen, at(250));
    }

    #[test]
    fn test_upsert_keeps_first_content_and_context() {
        let store = SqliteStore::in_memory().unwrap();
        let (hash, rec) = record("boom");
        let ctx = ErrorContext {
            request_path: "/checkout".to_string(),
            method: "POST".to_string(),
            actor_id: 4,
            site_id: None,
        };
        store.upsert(&hash, &rec, Some(&ctx), at(1)).unwrap();

        let other = ErrorRecord::new("Notice", "different", "b.php", 2);
        store
            .upsert(&hash, &other, Some(&ErrorContext::default()), at(2))
            .unwrap();

        let row = store.get(&hash).unwrap().unwrap();
        assert_eq!(row.severity, "Warning");
        assert_eq!(row.source_file, "wp-content/a.php");
        assert_eq!(row.context, Some(ctx));
    }

    #[test]
    fn test_last_seen_never_moves_backwards() {
        let store = SqliteStore::in_memory().unwrap();
        let (hash, rec) = record("boom");
        store.upsert(&hash, &rec, None, at(500)).unwrap();
        store.upsert(&hash, &rec, None, at(400)).unwrap();

        let row = store.get(&hash).unwrap().unwrap();
        assert_eq!(row.last_seen, at(500));
        assert!(row.first_seen <= row.last_seen);
    }

    #[test]
    fn test_list_orders_by_last_seen_desc() {
        let store = SqliteStore::in_memory().unwrap();
        let (old_hash, old) = record("old");
        let (new_hash, new) = record("new");
        store.upsert(&old_hash, &old, None, at(10)).unwrap();
        store.upsert(&new_hash, &new, None, at(20)).unwrap();

        let rows = store.list_by_last_seen().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].identity_hash, new_hash);
        assert_eq!(rows[1].identity_hash, old_hash);

        // Touching the old row moves it to the front.
        store.upsert(&old_hash, &old, None, at(30)).unwrap();
        let rows = store.list_by_last_seen().unwrap();
        assert_eq!(rows[0].identity_hash, old_hash);
    }

    #[test]
    fn test_count_and_total_occurrences() {
        let store = SqliteStore::in_memory().unwrap();
        let (a_hash, a) = record("a");
        let (b_hash, b) = record("b");
        for _ in 0..3 {
            store.upsert(&a_hash, &a, None, at(1)).unwrap();
        }
        store.upsert(&b_hash, &b, None, at(1)).unwrap();

        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.total_occurrences().unwrap(), 4);
    }

    #[test]
    fn test_clear_removes_rows_but_keeps_cursor() {
        let store = SqliteStore::in_memory().unwrap();
        let (hash, rec) = record("boom");
        store.upsert(&hash, &rec, None, at(1)).unwrap();
        store.write_cursor("offset", 99).unwrap();

        assert_eq!(store.clear().unwrap(), 1);
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.read_cursor("offset").unwrap(), Some(99));
    }

    #[test]
    fn test_destroy_then_reprovision() {
        let store = SqliteStore::in_memory().unwrap();
        let (hash, rec) = record("boom");
        store.upsert(&hash, &rec, None, at(1)).unwrap();

        store.destroy().unwrap();
        assert!(store.list_by_last_seen().unwrap().is_empty());

        assert_eq!(
            store.upsert(&hash, &rec, None, at(2)).unwrap(),
            UpsertOutcome::Inserted
        );
    }

    #[test]
    fn test_destroy_through_other_handle_reprovisions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("witness.db");
        let watcher = SqliteStore::new(&path).unwrap();
        let admin = SqliteStore::new(&path).unwrap();
        let (hash, rec) = record("boom");
        watcher.upsert(&hash, &rec, None, at(1)).unwrap();

        admin.destroy().unwrap();

        for i in 0..3 {
            watcher.upsert(&hash, &rec, None, at(2 + i)).unwrap();
        }
        assert_eq!(watcher.get(&hash).unwrap().unwrap().occurrence_count, 3);
        assert_eq!(admin.count().unwrap(), 1);
    }

    #[test]
    fn test_cursor_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.read_cursor("offset").unwrap(), None);

        store.write_cursor("offset", 1024).unwrap();
        store.write_cursor("offset", 2048).unwrap();
        assert_eq!(store.read_cursor("offset").unwrap(), Some(2048));

        assert!(store.delete_cursor("offset").unwrap());
        assert!(!store.delete_cursor("offset").unwrap());
        assert_eq!(store.read_cursor("offset").unwrap(), None);
    }

    #[test]
    fn test_cursor_rejects_offsets_beyond_i64() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store.write_cursor("offset", u64::MAX).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("witness.db");
        let (hash, rec) = record("boom");
        {
            let store = SqliteStore::new(&path).unwrap();
            store.upsert(&hash, &rec, None, at(1)).unwrap();
            store.write_cursor("offset", 512).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.read_cursor("offset").unwrap(), Some(512));
        assert_eq!(store.get(&hash).unwrap().unwrap().occurrence_count, 1);
        assert_eq!(store.db_path(), Some(path.as_path()));
    }

    #[test]
    fn test_concurrent_connections_do_not_lose_increments() {
        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("witness.db"));
        // Provision the schema before the writers race.
        drop(SqliteStore::new(path.as_path()).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    let store = SqliteStore::new(path.as_path()).unwrap();
                    let (hash, rec) = record("shared");
                    for i in 0..25 {
                        store.upsert(&hash, &rec, None, at(i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let store = SqliteStore::new(path.as_path()).unwrap();
        let (hash, _) = record("shared");
        assert_eq!(store.get(&hash).unwrap().unwrap().occurrence_count, 100);
    }
}
