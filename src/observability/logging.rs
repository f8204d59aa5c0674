//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;

/// Filter used when nothing else is configured.
pub const DEFAULT_LEVEL: &str = "warn";

/// Filter used with `--verbose`.
pub const VERBOSE_LEVEL: &str = "debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything other than `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
    /// Append to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LEVEL.to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    ///
    /// Filter precedence: `RUST_LOG`, then `--verbose`, then the configured
    /// level, then `warn`.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        Self::resolve(settings, verbose, std::env::var("RUST_LOG").ok())
    }

    fn resolve(settings: Option<&LoggingSettings>, verbose: bool, rust_log: Option<String>) -> Self {
        let configured = settings.and_then(|s| s.level.clone());
        let filter = rust_log
            .filter(|v| !v.trim().is_empty())
            .or_else(|| verbose.then(|| VERBOSE_LEVEL.to_string()))
            .or(configured)
            .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

        Self {
            filter,
            format: settings
                .and_then(|s| s.format.as_deref())
                .map_or(LogFormat::Pretty, LogFormat::parse),
            file: settings.and_then(|s| s.file.clone()),
        }
    }
}
