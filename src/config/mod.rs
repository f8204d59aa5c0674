//! Configuration management.
//!
//! Precedence, lowest to highest: built-in defaults, TOML config file,
//! `WITNESS_*` environment variables, CLI flags (applied by the binary through
//! the `with_*` builders).

use crate::models::MAX_MESSAGE_CHARS;
use crate::parser::LineParser;
use crate::services::DEFAULT_CURSOR_KEY;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default seconds between ingestion runs in `watch` mode.
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 300;

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "witness.db";

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "WITNESS_CONFIG_PATH";

/// Main configuration for silent-witness.
#[derive(Debug, Clone)]
pub struct WitnessConfig {
    /// Path of the tailed error log.
    pub log_path: Option<PathBuf>,
    /// Prefix stripped from reported source file paths.
    pub root_prefix: Option<String>,
    /// Path to the data directory.
    pub data_dir: PathBuf,
    /// Explicit database path; defaults to `<data_dir>/witness.db`.
    pub db_path: Option<PathBuf>,
    /// Key of the persisted cursor value.
    pub cursor_key: String,
    /// Maximum stored message length, in characters.
    pub max_message_chars: usize,
    /// Seconds between runs in `watch` mode.
    pub watch_interval_secs: u64,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Tailed log path.
    pub log_path: Option<String>,
    /// Root prefix.
    pub root_prefix: Option<String>,
    /// Data directory.
    pub data_dir: Option<String>,
    /// Database path.
    pub db_path: Option<String>,
    /// Cursor key.
    pub cursor_key: Option<String>,
    /// Message truncation length.
    pub max_message_chars: Option<usize>,
    /// Watch interval.
    pub watch_interval_secs: Option<u64>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `silent_witness=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for WitnessConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            root_prefix: None,
            data_dir: default_data_dir(),
            db_path: None,
            cursor_key: DEFAULT_CURSOR_KEY.to_string(),
            max_message_chars: MAX_MESSAGE_CHARS,
            watch_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
            logging: LoggingSettings::default(),
        }
    }
}

/// Platform data directory, or `.silent-witness` when none is available.
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "silent-witness")
        .map_or_else(|| PathBuf::from(".silent-witness"), |dirs| dirs.data_dir().to_path_buf())
}

/// Platform config file location, if the platform has a config dir.
fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|base_dirs| {
        base_dirs
            .config_dir()
            .join("silent-witness")
            .join("config.toml")
    })
}

impl WitnessConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration following the discovery order, then applies
    /// environment overrides.
    ///
    /// 1. `explicit` (the `--config` flag)
    /// 2. `WITNESS_CONFIG_PATH`
    /// 3. `<platform config dir>/silent-witness/config.toml`, if it exists
    /// 4. defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file (1 or 2) cannot be read
    /// or parsed, or if the platform file exists but is malformed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load_from_file(&path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::load_from_file(&path)?,
                None => Self::default(),
            },
        };

        let config = config.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Converts a `ConfigFile` to `WitnessConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(log_path) = file.log_path {
            config.log_path = Some(PathBuf::from(log_path));
        }
        if let Some(prefix) = file.root_prefix.filter(|p| !p.is_empty()) {
            config.root_prefix = Some(prefix);
        }
        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(db_path) = file.db_path {
            config.db_path = Some(PathBuf::from(db_path));
        }
        if let Some(key) = file.cursor_key {
            config.cursor_key = key;
        }
        if let Some(max) = file.max_message_chars {
            config.max_message_chars = max;
        }
        if let Some(interval) = file.watch_interval_secs {
            config.watch_interval_secs = interval;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Applies `WITNESS_LOG_PATH`, `WITNESS_ROOT_PREFIX` and `WITNESS_DB_PATH`
    /// as looked up by `lookup`. Empty values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(path) = lookup("WITNESS_LOG_PATH") {
            self.log_path = Some(PathBuf::from(path));
        }
        if let Some(prefix) = lookup("WITNESS_ROOT_PREFIX") {
            self.root_prefix = Some(prefix);
        }
        if let Some(path) = lookup("WITNESS_DB_PATH") {
            self.db_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty cursor key or a zero
    /// message limit or watch interval.
    pub fn validate(&self) -> Result<()> {
        if self.cursor_key.trim().is_empty() {
            return Err(Error::InvalidInput("cursor_key must not be empty".to_string()));
        }
        if self.max_message_chars == 0 {
            return Err(Error::InvalidInput(
                "max_message_chars must be at least 1".to_string(),
            ));
        }
        if self.watch_interval_secs == 0 {
            return Err(Error::InvalidInput(
                "watch_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the effective database path.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DB_FILE_NAME))
    }

    /// Returns the tailed log path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no log path is configured.
    pub fn require_log_path(&self) -> Result<&Path> {
        self.log_path.as_deref().ok_or_else(|| {
            Error::InvalidInput(
                "no log path configured (set log_path, WITNESS_LOG_PATH, or --log)".to_string(),
            )
        })
    }

    /// Builds the line parser for this configuration.
    #[must_use]
    pub fn parser(&self) -> LineParser {
        let parser = LineParser::new().with_max_message_chars(self.max_message_chars);
        match &self.root_prefix {
            Some(prefix) => parser.with_root_prefix(prefix.as_str()),
            None => parser,
        }
    }

    /// Sets the tailed log path.
    #[must_use]
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Sets the root prefix.
    #[must_use]
    pub fn with_root_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.root_prefix = Some(prefix.into()).filter(|p| !p.is_empty());
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets an explicit database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Sets the watch interval.
    #[must_use]
    pub const fn with_watch_interval_secs(mut self, secs: u64) -> Self {
        self.watch_interval_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = WitnessConfig::default();
        assert_eq!(config.cursor_key, "silent_witness_log_offset");
        assert_eq!(config.max_message_chars, 2000);
        assert_eq!(config.watch_interval_secs, 300);
        assert!(config.log_path.is_none());
        assert_eq!(config.db_path(), config.data_dir.join("witness.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
log_path = "/var/log/php/error.log"
root_prefix = "/var/www/site/"
data_dir = "/tmp/witness"
max_message_chars = 500
watch_interval_secs = 60

[logging]
level = "info"
format = "json"
"#,
        )
        .unwrap();

        let config = WitnessConfig::load_from_file(&path).unwrap();
        assert_eq!(
            config.log_path.as_deref(),
            Some(Path::new("/var/log/php/error.log"))
        );
        assert_eq!(config.root_prefix.as_deref(), Some("/var/www/site/"));
        assert_eq!(config.db_path(), PathBuf::from("/tmp/witness/witness.db"));
        assert_eq!(config.max_message_chars, 500);
        assert_eq!(config.watch_interval_secs, 60);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert_eq!(config.cursor_key, DEFAULT_CURSOR_KEY);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_path = [").unwrap();

        let err = WitnessConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, Error::OperationFailed { ref operation, .. } if operation == "parse_config_file"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = WitnessConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("WITNESS_LOG_PATH", "/logs/php.log"),
            ("WITNESS_ROOT_PREFIX", ""),
            ("WITNESS_DB_PATH", "/data/w.db"),
        ]
        .into_iter()
        .collect();

        let config = WitnessConfig::default()
            .with_root_prefix("/srv/")
            .with_env_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.log_path.as_deref(), Some(Path::new("/logs/php.log")));
        assert_eq!(config.root_prefix.as_deref(), Some("/srv/"));
        assert_eq!(config.db_path(), PathBuf::from("/data/w.db"));
    }

    #[test]
    fn test_require_log_path() {
        let config = WitnessConfig::default();
        assert!(matches!(config.require_log_path(), Err(Error::InvalidInput(_))));
        let config = config.with_log_path("/x.log");
        assert_eq!(config.require_log_path().unwrap(), Path::new("/x.log"));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(WitnessConfig::default().with_watch_interval_secs(0).validate().is_err());

        let mut config = WitnessConfig::default();
        config.max_message_chars = 0;
        assert!(config.validate().is_err());

        let mut config = WitnessConfig::default();
        config.cursor_key = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parser_carries_prefix_and_limit() {
        let mut config = WitnessConfig::default().with_root_prefix("/var/www/site/");
        config.max_message_chars = 5;
        let parser = config.parser();
        assert_eq!(parser.root_prefix(), Some("/var/www/site/"));

        let record = parser
            .parse("[t] PHP Warning:  abcdefgh in /var/www/site/a.php on line 1")
            .unwrap();
        assert_eq!(record.message, "abcde");
        assert_eq!(record.source_file, "a.php");
    }
}
