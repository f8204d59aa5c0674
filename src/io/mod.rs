//! Export I/O subsystem.
//!
//! Writes aggregate rows to a reader-friendly format.
//!
//! # Supported Formats
//!
//! | Format | Extension | Notes |
//! |--------|-----------|-------|
//! | JSON | `.json` | Single array |
//! | NDJSON | `.ndjson`, `.jsonl` | One object per line |
//! | CSV | `.csv` | Header row; context as embedded JSON |
//!
//! Timestamps are RFC 3339 in every format.
//!
//! # Example
//!
//! ```rust
//! use silent_witness::io::{ExportFormat, export_rows};
//!
//! let mut out = Vec::new();
//! let written = export_rows(&[], &mut out, ExportFormat::Json)?;
//! assert_eq!(written, 0);
//! assert_eq!(out, b"[]\n");
//! # Ok::<(), silent_witness::Error>(())
//! ```

pub mod formats;
pub mod traits;

// Re-exports for convenience
pub use formats::{ExportFormat, create_export_sink};
pub use traits::ExportSink;

use crate::Result;
use crate::models::AggregateRow;
use std::io::Write;

/// Writes `rows` to `writer` in `format`, returning the number written.
///
/// # Errors
///
/// Returns an error if serialization or I/O fails.
pub fn export_rows<W: Write>(
    rows: &[AggregateRow],
    writer: W,
    format: ExportFormat,
) -> Result<usize> {
    let mut sink = create_export_sink(writer, format);
    for row in rows {
        sink.write(row)?;
    }
    sink.finalize()?;
    tracing::debug!(rows = rows.len(), %format, "Exported aggregates");
    Ok(rows.len())
}
