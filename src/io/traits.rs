//! Export sink trait.
//!
//! Format adapters implement [`ExportSink`] to write aggregate rows one at a
//! time, then flush whatever framing the format needs in
//! [`finalize`](ExportSink::finalize).

use crate::Result;
use crate::models::AggregateRow;

/// Trait for export format adapters.
///
/// # Example
///
/// ```rust,ignore
/// let mut sink = create_export_sink(std::io::stdout(), ExportFormat::Ndjson)?;
/// for row in &rows {
///     sink.write(row)?;
/// }
/// sink.finalize()?;
/// ```
pub trait ExportSink {
    /// Writes a single row to the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or I/O fails.
    fn write(&mut self, row: &AggregateRow) -> Result<()>;

    /// Finalizes the export, writing any footers and flushing buffers.
    ///
    /// This method consumes the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O fails.
    fn finalize(self: Box<Self>) -> Result<()>;
}
