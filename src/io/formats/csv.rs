//! CSV format adapter for export.
//!
//! One header row, then one record per aggregate. Timestamps are RFC 3339;
//! the optional context is embedded as a JSON string.

use crate::io::traits::ExportSink;
use crate::models::AggregateRow;
use crate::{Error, Result};
use chrono::SecondsFormat;
use std::io::Write;

/// Column headers, in record order.
pub const CSV_HEADERS: [&str; 9] = [
    "identity_hash",
    "severity",
    "message",
    "source_file",
    "source_line",
    "occurrence_count",
    "first_seen",
    "last_seen",
    "context",
];

/// CSV export sink.
///
/// Writes rows as CSV with headers. Headers are written even when no rows
/// follow.
pub struct CsvExportSink<W: Write> {
    writer: csv::Writer<W>,
    /// Whether headers have been written.
    headers_written: bool,
}

impl<W: Write> CsvExportSink<W> {
    /// Creates a new CSV export sink.
    #[must_use]
    pub fn new(writer: W) -> Self {
        let csv_writer = csv::WriterBuilder::new()
            .has_headers(false) // We write headers manually
            .from_writer(writer);

        Self {
            writer: csv_writer,
            headers_written: false,
        }
    }

    /// Writes headers if not already written.
    fn ensure_headers(&mut self) -> Result<()> {
        if !self.headers_written {
            self.writer
                .write_record(CSV_HEADERS)
                .map_err(|e| Error::OperationFailed {
                    operation: "write_csv_headers".to_string(),
                    cause: e.to_string(),
                })?;
            self.headers_written = true;
        }
        Ok(())
    }
}

impl<W: Write> ExportSink for CsvExportSink<W> {
    fn write(&mut self, row: &AggregateRow) -> Result<()> {
        self.ensure_headers()?;

        let context = row
            .context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::operation("write_csv", e))?
            .unwrap_or_default();

        let source_line = row.source_line.to_string();
        let occurrence_count = row.occurrence_count.to_string();
        let first_seen = row.first_seen.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let last_seen = row.last_seen.to_rfc3339_opts(SecondsFormat::AutoSi, true);

        self.writer
            .write_record([
                row.identity_hash.as_str(),
                row.severity.as_str(),
                row.message.as_str(),
                row.source_file.as_str(),
                source_line.as_str(),
                occurrence_count.as_str(),
                first_seen.as_str(),
                last_seen.as_str(),
                context.as_str(),
            ])
            .map_err(|e| Error::OperationFailed {
                operation: "write_csv".to_string(),
                cause: e.to_string(),
            })?;

        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<()> {
        self.ensure_headers()?;
        self.writer.flush().map_err(|e| Error::OperationFailed {
            operation: "flush_csv".to_string(),
            cause: e.to_string(),
        })?;
        Ok(())
    }
}
