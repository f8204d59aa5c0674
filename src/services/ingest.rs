//! Incremental ingestion of the tailed log.
//!
//! One call to [`IngestionEngine::ingest`] reads everything appended since the
//! last run, up to the file size observed at the start of the call, and folds
//! each matching line into the aggregate store.

use crate::models::{IngestReport, UpsertOutcome};
use crate::observability::{LINES_INGESTED_TOTAL, LINES_SKIPPED_TOTAL, ROTATIONS_TOTAL};
use crate::parser::LineParser;
use crate::services::cursor::OffsetCursor;
use crate::services::identity::IdentityHasher;
use crate::storage::AggregateStore;
use crate::{Error, Result};
use chrono::Utc;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Snapshot-at-start log tailer.
///
/// Stateless between calls: everything that must survive lives in the
/// cursor store and the aggregate store. Does not follow appends made
/// during its own run; the next call picks them up.
///
/// # Cursor rules
///
/// - The persisted cursor is the byte position just after the last complete
///   (newline-terminated) line consumed. A trailing partial line is left for
///   the next run.
/// - Unparseable lines are consumed like any other.
/// - If an upsert fails, the cursor is persisted at the start of the failed
///   line and the run aborts with [`Error::StoreWriteFailure`].
pub struct IngestionEngine {
    log_path: PathBuf,
    parser: LineParser,
    aggregates: Arc<dyn AggregateStore>,
    cursor: OffsetCursor,
}

impl IngestionEngine {
    /// Creates an engine over explicit dependencies.
    pub fn new(
        log_path: impl Into<PathBuf>,
        parser: LineParser,
        aggregates: Arc<dyn AggregateStore>,
        cursor: OffsetCursor,
    ) -> Self {
        Self {
            log_path: log_path.into(),
            parser,
            aggregates,
            cursor,
        }
    }

    /// Returns the tailed log path.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Ingests all complete lines appended since the last run.
    ///
    /// # Errors
    ///
    /// - [`Error::SourceNotFound`] if the log does not exist; nothing is mutated.
    /// - [`Error::SourceUnreadable`] if it cannot be opened or sized (nothing is
    ///   mutated) or a read fails mid-way (the cursor keeps the lines consumed so far).
    /// - [`Error::StoreWriteFailure`] if an upsert fails.
    #[instrument(skip(self), fields(log_path = %self.log_path.display()))]
    pub fn ingest(&self) -> Result<IngestReport> {
        let mut file = self.open_source()?;
        let file_size = file
            .metadata()
            .map_err(|e| self.unreadable(&e))?
            .len();

        let reconciled = self.cursor.reconcile(file_size)?;
        if reconciled.rotated {
            warn!(file_size, "Log shrank below stored cursor, re-reading from start");
            metrics::counter!(ROTATIONS_TOTAL).increment(1);
        }

        let start_offset = reconciled.effective_offset;
        file.seek(SeekFrom::Start(start_offset))
            .map_err(|e| self.unreadable(&e))?;

        let mut report = IngestReport {
            start_offset,
            end_offset: start_offset,
            rotated: reconciled.rotated,
            ..IngestReport::default()
        };

        let scan = self.scan(
            BufReader::new(file.take(file_size - start_offset)),
            &mut report,
        );

        // Lines before a failure stay consumed; the failed line does not.
        self.cursor.write(report.end_offset)?;

        metrics::counter!(LINES_INGESTED_TOTAL).increment(report.new_entries);
        metrics::counter!(LINES_SKIPPED_TOTAL).increment(report.lines_skipped);

        scan?;

        info!(
            start_offset = report.start_offset,
            end_offset = report.end_offset,
            new_entries = report.new_entries,
            new_identities = report.new_identities,
            lines_skipped = report.lines_skipped,
            rotated = report.rotated,
            "Ingestion complete"
        );
        Ok(report)
    }

    /// Consumes complete lines from `reader`, advancing `report.end_offset`
    /// past each line that was fully handled.
    fn scan(&self, mut reader: impl BufRead, report: &mut IngestReport) -> Result<()> {
        let mut buf = Vec::with_capacity(512);
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| self.unreadable(&e))?;

            // End of snapshot, or a partial line still being written.
            if read == 0 || buf.last() != Some(&b'\n') {
                return Ok(());
            }

            let line = String::from_utf8_lossy(&buf);
            if let Some(record) = self.parser.parse(&line) {
                let hash = IdentityHasher::hash(&record);
                match self.aggregates.upsert(&hash, &record, None, Utc::now()) {
                    Ok(UpsertOutcome::Inserted) => report.new_identities += 1,
                    Ok(UpsertOutcome::Incremented) => {},
                    Err(e) => {
                        warn!(
                            identity_hash = %hash,
                            byte_offset = report.end_offset,
                            error = %e,
                            "Upsert failed, stopping before this line"
                        );
                        return Err(Error::StoreWriteFailure {
                            identity_hash: hash.to_string(),
                            byte_offset: report.end_offset,
                            cause: e.to_string(),
                        });
                    },
                }
                report.new_entries += 1;
            } else {
                debug!(byte_offset = report.end_offset, "Skipping non-matching line");
                report.lines_skipped += 1;
            }

            report.lines_read += 1;
            report.end_offset += read as u64;
        }
    }

    fn open_source(&self) -> Result<File> {
        let file = File::open(&self.log_path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::SourceNotFound {
                    path: self.log_path.display().to_string(),
                }
            } else {
                self.unreadable(&e)
            }
        })?;

        let metadata = file.metadata().map_err(|e| self.unreadable(&e))?;
        if !metadata.is_file() {
            return Err(Error::SourceUnreadable {
                path: self.log_path.display().to_string(),
                cause: "not a regular file".to_string(),
            });
        }
        Ok(file)
    }

    fn unreadable(&self, e: &std::io::Error) -> Error {
        Error::SourceUnreadable {
            path: self.log_path.display().to_string(),
            cause: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cursor::DEFAULT_CURSOR_KEY;
    use crate::storage::{CursorStore, MemoryStore};
    use std::io::Write;
    use tempfile::TempDir;

    const WARNING: &str = "[12-Feb-2026 08:00:00 UTC] PHP Warning:  Undefined variable $x in /var/www/site/wp-content/plugins/foo/foo.php on line 10\n";
    const NOTICE: &str = "[12-Feb-2026 08:00:01 UTC] PHP Notice:  Undefined index: id in /var/www/site/index.php on line 3\n";
    const TRACE: &str = "PHP Stack trace:\n";

    struct Fixture {
        _dir: TempDir,
        path: PathBuf,
        store: Arc<MemoryStore>,
        engine: IngestionEngine,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("error.log");
        let store = Arc::new(MemoryStore::new());
        let engine = IngestionEngine::new(
            &path,
            LineParser::new().with_root_prefix("/var/www/site/"),
            store.clone(),
            OffsetCursor::new(store.clone(), DEFAULT_CURSOR_KEY),
        );
        Fixture {
            _dir: dir,
            path,
            store,
            engine,
        }
    }

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_missing_source_mutates_nothing() {
        let fx = fixture();
        let err = fx.engine.ingest().unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));
        assert_eq!(fx.store.read_cursor(DEFAULT_CURSOR_KEY).unwrap(), None);
    }

    #[test]
    fn test_directory_source_is_unreadable() {
        let fx = fixture();
        std::fs::create_dir(&fx.path).unwrap();
        let err = fx.engine.ingest().unwrap_err();
        assert!(matches!(err, Error::SourceUnreadable { .. }));
        assert_eq!(fx.store.read_cursor(DEFAULT_CURSOR_KEY).unwrap(), None);
    }

    #[test]
    fn test_ingest_counts_matches_and_advances_past_skips() {
        let fx = fixture();
        append(&fx.path, &format!("{WARNING}{TRACE}{NOTICE}{WARNING}"));

        let report = fx.engine.ingest().unwrap();
        assert_eq!(report.new_entries, 3);
        assert_eq!(report.new_identities, 2);
        assert_eq!(report.lines_read, 4);
        assert_eq!(report.lines_skipped, 1);
        assert_eq!(report.start_offset, 0);
        assert_eq!(
            report.end_offset,
            (2 * WARNING.len() + TRACE.len() + NOTICE.len()) as u64
        );
        assert_eq!(fx.store.count().unwrap(), 2);
    }

    #[test]
    fn test_second_run_without_growth_is_noop() {
        let fx = fixture();
        append(&fx.path, WARNING);
        fx.engine.ingest().unwrap();
        let rows_before = fx.store.list_by_last_seen().unwrap();

        let report = fx.engine.ingest().unwrap();
        assert_eq!(report.new_entries, 0);
        assert_eq!(report.start_offset, report.end_offset);
        assert_eq!(fx.store.list_by_last_seen().unwrap(), rows_before);
        assert_eq!(
            fx.store.read_cursor(DEFAULT_CURSOR_KEY).unwrap(),
            Some(WARNING.len() as u64)
        );
    }

    #[test]
    fn test_partial_trailing_line_left_for_next_run() {
        let fx = fixture();
        let (head, tail) = NOTICE.split_at(20);
        append(&fx.path, &format!("{WARNING}{head}"));

        let report = fx.engine.ingest().unwrap();
        assert_eq!(report.new_entries, 1);
        assert_eq!(report.end_offset, WARNING.len() as u64);

        append(&fx.path, tail);
        let report = fx.engine.ingest().unwrap();
        assert_eq!(report.new_entries, 1);
        assert_eq!(report.end_offset, (WARNING.len() + NOTICE.len()) as u64);
    }

    #[test]
    fn test_rotation_rereads_from_start() {
        let fx = fixture();
        append(&fx.path, &format!("{WARNING}{WARNING}{WARNING}"));
        fx.engine.ingest().unwrap();

        std::fs::write(&fx.path, NOTICE).unwrap();
        let report = fx.engine.ingest().unwrap();
        assert!(report.rotated);
        assert_eq!(report.start_offset, 0);
        assert_eq!(report.new_entries, 1);
        assert_eq!(report.end_offset, NOTICE.len() as u64);
    }

    #[test]
    fn test_store_failure_stops_cursor_before_failed_line() {
        let fx = fixture();
        append(&fx.path, &format!("{WARNING}{TRACE}{NOTICE}{WARNING}"));
        fx.store.fail_upserts_after(1);

        let err = fx.engine.ingest().unwrap_err();
        let expected_offset = (WARNING.len() + TRACE.len()) as u64;
        match err {
            Error::StoreWriteFailure { byte_offset, .. } => {
                assert_eq!(byte_offset, expected_offset);
            },
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            fx.store.read_cursor(DEFAULT_CURSOR_KEY).unwrap(),
            Some(expected_offset)
        );

        // Retry resumes at the failed line and counts it once.
        fx.store.heal();
        let report = fx.engine.ingest().unwrap();
        assert_eq!(report.start_offset, expected_offset);
        assert_eq!(report.new_entries, 2);

        let warning = fx.engine.parser.parse(WARNING).unwrap();
        let row = fx.store.get(&IdentityHasher::hash(&warning)).unwrap().unwrap();
        assert_eq!(row.occurrence_count, 2);
    }

    #[test]
    fn test_invalid_utf8_line_still_consumed() {
        let fx = fixture();
        let mut bytes = b"\xff\xfe garbage\n".to_vec();
        bytes.extend_from_slice(WARNING.as_bytes());
        std::fs::write(&fx.path, &bytes).unwrap();

        let report = fx.engine.ingest().unwrap();
        assert_eq!(report.lines_skipped, 1);
        assert_eq!(report.new_entries, 1);
        assert_eq!(report.end_offset, bytes.len() as u64);
    }

    #[test]
    fn test_crlf_lines_parse() {
        let fx = fixture();
        append(&fx.path, &WARNING.replace('\n', "\r\n"));
        assert_eq!(fx.engine.ingest().unwrap().new_entries, 1);
    }
}
