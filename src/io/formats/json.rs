//! JSON format adapters for export.
//!
//! Supports both a single JSON array and newline-delimited JSON (NDJSON).

use crate::io::traits::ExportSink;
use crate::models::AggregateRow;
use crate::{Error, Result};
use std::io::Write;

fn write_failed(operation: &str, e: impl std::fmt::Display) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}

/// JSON array export sink.
///
/// Pretty-printed. Writes `[` before the first row and `]` on finalize, so
/// an empty export is `[]`.
pub struct JsonExportSink<W: Write> {
    writer: W,
    /// Number of records written.
    count: usize,
}

impl<W: Write> JsonExportSink<W> {
    /// Creates a new JSON array export sink.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer, count: 0 }
    }
}

impl<W: Write> ExportSink for JsonExportSink<W> {
    fn write(&mut self, row: &AggregateRow) -> Result<()> {
        let lead: &[u8] = if self.count == 0 { b"[\n" } else { b",\n" };
        self.writer
            .write_all(lead)
            .map_err(|e| write_failed("write_json", e))?;
        serde_json::to_writer_pretty(&mut self.writer, row)
            .map_err(|e| write_failed("write_json", e))?;
        self.count += 1;
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<()> {
        let tail: &[u8] = if self.count == 0 { b"[]\n" } else { b"\n]\n" };
        self.writer
            .write_all(tail)
            .map_err(|e| write_failed("write_json", e))?;
        self.writer
            .flush()
            .map_err(|e| write_failed("flush_json", e))?;
        Ok(())
    }
}

/// NDJSON export sink.
///
/// Writes one JSON object per line.
pub struct NdjsonExportSink<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonExportSink<W> {
    /// Creates a new NDJSON export sink.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ExportSink for NdjsonExportSink<W> {
    fn write(&mut self, row: &AggregateRow) -> Result<()> {
        serde_json::to_writer(&mut self.writer, row).map_err(|e| write_failed("write_ndjson", e))?;
        writeln!(self.writer).map_err(|e| write_failed("write_ndjson", e))?;
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| write_failed("flush_ndjson", e))?;
        Ok(())
    }
}
