//! Export command handler.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use silent_witness::config::WitnessConfig;
use silent_witness::io::{ExportFormat, export_rows};
use silent_witness::{Error, Result, WitnessService};

/// Executes the export command.
///
/// Without `--format`, the format follows the output file extension, and
/// stdout defaults to JSON.
pub fn cmd_export(
    config: &WitnessConfig,
    format: Option<ExportFormat>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let format = resolve_format(format, output.as_deref())?;

    let service = WitnessService::from_config(config)?;
    let rows = service.export()?;

    match output {
        Some(path) => {
            let file = File::create(&path).map_err(|e| Error::OperationFailed {
                operation: "create_export_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;
            let written = export_rows(&rows, BufWriter::new(file), format)?;
            eprintln!("Exported {written} aggregates to {}", path.display());
        },
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            export_rows(&rows, &mut lock, format)?;
            lock.flush()
                .map_err(|e| Error::operation("flush_stdout", e))?;
        },
    }

    Ok(ExitCode::SUCCESS)
}

/// An explicit `--format` wins; otherwise the output extension decides, and
/// stdout gets JSON.
fn resolve_format(format: Option<ExportFormat>, output: Option<&Path>) -> Result<ExportFormat> {
    match (format, output) {
        (Some(format), _) => Ok(format),
        (None, Some(path)) => ExportFormat::from_path(path),
        (None, None) => Ok(ExportFormat::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silent_witness::{ErrorRecord, IdentityHasher, SqliteStore};
    use silent_witness::storage::AggregateStore;
    use test_case::test_case;

    #[test_case(None, None, ExportFormat::Json ; "stdout defaults to json")]
    #[test_case(None, Some("out.csv"), ExportFormat::Csv ; "csv extension")]
    #[test_case(None, Some("out.jsonl"), ExportFormat::Ndjson ; "jsonl extension")]
    #[test_case(Some(ExportFormat::Ndjson), Some("out.csv"), ExportFormat::Ndjson ; "flag beats extension")]
    fn test_resolve_format(flag: Option<ExportFormat>, output: Option<&str>, expected: ExportFormat) {
        let resolved = resolve_format(flag, output.map(Path::new)).unwrap();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_resolve_format_rejects_unknown_extension() {
        let err = resolve_format(None, Some(Path::new("out.parquet"))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_export_to_file_follows_extension() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("w.db");
        let record = ErrorRecord::new("Warning", "Undefined variable $x", "a.php", 10);
        {
            let store = SqliteStore::new(&db_path).unwrap();
            store
                .upsert(&IdentityHasher::hash(&record), &record, None, chrono::Utc::now())
                .unwrap();
        }

        let output = dir.path().join("errors.csv");
        let config = WitnessConfig::default().with_db_path(&db_path);
        cmd_export(&config, None, Some(output.clone())).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        let mut lines = written.lines();
        assert!(lines.next().unwrap().starts_with("identity_hash,"));
        assert!(lines.next().unwrap().contains("Undefined variable $x"));
        assert_eq!(lines.next(), None);
    }
}
