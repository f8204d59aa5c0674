//! Host-facing entry points: ingest, export, clear, destroy, status.

use crate::config::WitnessConfig;
use crate::models::{AggregateRow, IngestReport, WitnessStatus};
use crate::observability::{CLEAR_TOTAL, DESTROY_TOTAL};
use crate::parser::LineParser;
use crate::services::cursor::{DEFAULT_CURSOR_KEY, OffsetCursor, reconcile};
use crate::services::ingest::IngestionEngine;
use crate::storage::{AggregateStore, CursorStore, SqliteStore};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Explicit confirmation for destructive operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The caller confirmed the operation.
    Confirmed,
    /// No confirmation was given; the operation is refused.
    NotConfirmed,
}

impl Confirmation {
    /// Maps a `--yes` style flag to a confirmation.
    #[must_use]
    pub const fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::NotConfirmed
        }
    }

    fn require(self, operation: &str) -> Result<()> {
        match self {
            Self::Confirmed => Ok(()),
            Self::NotConfirmed => Err(Error::ConfirmationRequired {
                operation: operation.to_string(),
            }),
        }
    }
}

/// Service bundling the ingestion engine with the maintenance operations.
///
/// A service built without a log path still serves `export`, `clear` and
/// `destroy`; `ingest` and `status` then fail with [`Error::InvalidInput`].
pub struct WitnessService {
    engine: Option<IngestionEngine>,
    parser: LineParser,
    cursor: OffsetCursor,
    aggregates: Arc<dyn AggregateStore>,
    cursors: Arc<dyn CursorStore>,
}

impl WitnessService {
    /// Creates a service using the default cursor key.
    pub fn new(
        log_path: impl Into<PathBuf>,
        parser: LineParser,
        aggregates: Arc<dyn AggregateStore>,
        cursors: Arc<dyn CursorStore>,
    ) -> Self {
        Self::assemble(Some(log_path.into()), parser, aggregates, cursors, DEFAULT_CURSOR_KEY)
    }

    /// Creates a service over the stores only, with no log to tail.
    pub fn store_only(aggregates: Arc<dyn AggregateStore>, cursors: Arc<dyn CursorStore>) -> Self {
        Self::assemble(None, LineParser::new(), aggregates, cursors, DEFAULT_CURSOR_KEY)
    }

    /// Builds a service from configuration, backed by a [`SqliteStore`].
    ///
    /// The log path is optional here; it is only required by
    /// [`ingest`](Self::ingest) and [`status`](Self::status).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn from_config(config: &WitnessConfig) -> Result<Self> {
        let store = Arc::new(SqliteStore::new(config.db_path())?);
        Ok(Self::assemble(
            config.log_path.clone(),
            config.parser(),
            store.clone(),
            store,
            &config.cursor_key,
        ))
    }

    fn assemble(
        log_path: Option<PathBuf>,
        parser: LineParser,
        aggregates: Arc<dyn AggregateStore>,
        cursors: Arc<dyn CursorStore>,
        cursor_key: &str,
    ) -> Self {
        let cursor = OffsetCursor::new(Arc::clone(&cursors), cursor_key);
        let engine = log_path.map(|path| {
            IngestionEngine::new(path, parser.clone(), Arc::clone(&aggregates), cursor.clone())
        });
        Self {
            engine,
            parser,
            cursor,
            aggregates,
            cursors,
        }
    }

    /// Stores the cursor under `key` instead of the default.
    #[must_use]
    pub fn with_cursor_key(self, key: &str) -> Self {
        let log_path = self.log_path().map(Path::to_path_buf);
        Self::assemble(log_path, self.parser, self.aggregates, self.cursors, key)
    }

    /// Returns the tailed log path, if one is configured.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.engine.as_ref().map(IngestionEngine::log_path)
    }

    fn engine(&self) -> Result<&IngestionEngine> {
        self.engine.as_ref().ok_or_else(|| {
            Error::InvalidInput(
                "no log path configured (set log_path, WITNESS_LOG_PATH, or --log)".to_string(),
            )
        })
    }

    /// Runs one incremental ingestion pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] without a log path; otherwise see
    /// [`IngestionEngine::ingest`].
    pub fn ingest(&self) -> Result<IngestReport> {
        self.engine()?.ingest()
    }

    /// Returns every aggregate row, most recently seen first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn export(&self) -> Result<Vec<AggregateRow>> {
        self.aggregates.list_by_last_seen()
    }

    /// Deletes all rows and resets the cursor to 0, so the next ingest
    /// rebuilds the aggregates from the whole current log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfirmationRequired`] unless confirmed.
    #[instrument(skip(self))]
    pub fn clear(&self, confirmation: Confirmation) -> Result<u64> {
        confirmation.require("clear")?;
        let removed = self.aggregates.clear()?;
        self.cursor.reset()?;
        info!(removed, "Cleared aggregates and reset cursor");
        metrics::counter!(CLEAR_TOTAL).increment(1);
        Ok(removed)
    }

    /// Drops the aggregate schema and deletes the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfirmationRequired`] unless confirmed.
    #[instrument(skip(self))]
    pub fn destroy(&self, confirmation: Confirmation) -> Result<()> {
        confirmation.require("destroy")?;
        self.aggregates.destroy()?;
        let existed = self.cursor.delete()?;
        warn!(cursor_existed = existed, "Destroyed aggregate store");
        metrics::counter!(DESTROY_TOTAL).increment(1);
        Ok(())
    }

    /// Reports the log size, cursor position and aggregate totals.
    ///
    /// Read-only: neither the cursor nor the store are touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] without a log path, an error if the
    /// store cannot be read, or [`Error::SourceUnreadable`] if the log exists
    /// but cannot be sized.
    pub fn status(&self) -> Result<WitnessStatus> {
        let path = self.engine()?.log_path();
        let file_size = match std::fs::metadata(path) {
            Ok(meta) => Some(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(Error::SourceUnreadable {
                    path: path.display().to_string(),
                    cause: e.to_string(),
                });
            },
        };

        let cursor = self.cursor.read()?;
        let pending_bytes = file_size.map_or(0, |size| {
            let reconciled = reconcile(cursor, size);
            size - reconciled.effective_offset
        });

        Ok(WitnessStatus {
            log_path: path.display().to_string(),
            file_size,
            cursor,
            pending_bytes,
            rows: self.aggregates.count()?,
            occurrences: self.aggregates.total_occurrences()?,
        })
    }
}
