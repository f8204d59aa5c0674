//! Format adapters for export.
//!
//! Each format implements the [`ExportSink`] trait.

pub mod csv;
pub mod json;

use crate::{Error, Result};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use super::traits::ExportSink;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportFormat {
    /// A single JSON array.
    #[default]
    Json,
    /// Newline-delimited JSON, one object per row.
    Ndjson,
    /// CSV with a header row.
    Csv,
}

impl ExportFormat {
    /// Returns all export formats.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Json, Self::Ndjson, Self::Csv]
    }

    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            Self::Csv => "csv",
        }
    }

    /// Detects format from file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is not recognized.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("ndjson" | "jsonl") => Ok(Self::Ndjson),
            Some("csv") => Ok(Self::Csv),
            Some(ext) => Err(Error::InvalidInput(format!(
                "Unsupported file extension: .{ext}"
            ))),
            None => Err(Error::InvalidInput(
                "Cannot determine format: file has no extension".to_string(),
            )),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            "csv" => Ok(Self::Csv),
            _ => Err(Error::InvalidInput(format!("Unknown format: {s}"))),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Creates an export sink for the given format and writer.
#[must_use]
pub fn create_export_sink<'w, W: Write + 'w>(
    writer: W,
    format: ExportFormat,
) -> Box<dyn ExportSink + 'w> {
    match format {
        ExportFormat::Json => Box::new(json::JsonExportSink::new(writer)),
        ExportFormat::Ndjson => Box::new(json::NdjsonExportSink::new(writer)),
        ExportFormat::Csv => Box::new(csv::CsvExportSink::new(writer)),
    }
}
