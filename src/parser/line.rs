//! Anchored regular-expression matcher for PHP error-log lines.
// Allow expect() on the static grammar regex - it is guaranteed to compile
#![allow(clippy::expect_used)]

use crate::models::{ErrorRecord, MAX_MESSAGE_CHARS, truncate_chars};
use regex::Regex;
use std::sync::LazyLock;

// The message is greedy so that a message containing " in " still leaves the
// file path as the text after the last " in " that is followed by " on line N".
// The gap after the severity colon is any whitespace run, not PHP's usual two spaces.
static LINE_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[(?P<timestamp>[^\]]+)\] PHP (?P<severity>[^:]+):\s+(?P<message>.+) in (?P<file>.+) on line (?P<line>\d+)\s*$",
    )
    .expect("static regex: PHP error log line grammar")
});

/// Parser for PHP error-log lines.
///
/// Holds the per-installation settings: the root directory stripped from
/// source paths, and the message length bound.
#[derive(Debug, Clone)]
pub struct LineParser {
    root_prefix: Option<String>,
    max_message_chars: usize,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    /// Creates a parser with no root prefix and the default message bound.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root_prefix: None,
            max_message_chars: MAX_MESSAGE_CHARS,
        }
    }

    /// Sets the installation root stripped from the start of source paths.
    ///
    /// An empty prefix disables stripping.
    #[must_use]
    pub fn with_root_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.root_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Sets the maximum stored message length in characters.
    #[must_use]
    pub const fn with_max_message_chars(mut self, max_chars: usize) -> Self {
        self.max_message_chars = max_chars;
        self
    }

    /// Returns the configured root prefix.
    #[must_use]
    pub fn root_prefix(&self) -> Option<&str> {
        self.root_prefix.as_deref()
    }

    /// Parses one line into an [`ErrorRecord`].
    ///
    /// Returns `None` when the line does not follow the grammar. A trailing
    /// `\r` or `\n` is ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use silent_witness::LineParser;
    ///
    /// let parser = LineParser::new().with_root_prefix("/var/www/site/");
    /// let record = parser
    ///     .parse("[12-Feb-2026 08:00:00 UTC] PHP Warning:  Undefined variable $x in /var/www/site/wp-content/plugins/foo/foo.php on line 10")
    ///     .unwrap();
    /// assert_eq!(record.severity, "Warning");
    /// assert_eq!(record.source_file, "wp-content/plugins/foo/foo.php");
    /// assert_eq!(record.source_line, 10);
    ///
    /// assert!(parser.parse("#0 /var/www/site/index.php(17): main()").is_none());
    /// ```
    #[must_use]
    pub fn parse(&self, line: &str) -> Option<ErrorRecord> {
        let line = line.trim_end_matches(['\r', '\n']);
        let caps = LINE_GRAMMAR.captures(line)?;

        let source_line: u32 = caps.name("line")?.as_str().parse().ok()?;
        let file = caps.name("file")?.as_str();

        Some(ErrorRecord {
            severity: caps.name("severity")?.as_str().to_string(),
            message: truncate_chars(caps.name("message")?.as_str(), self.max_message_chars)
                .to_string(),
            source_file: self.strip_root(file).to_string(),
            source_line,
        })
    }

    fn strip_root<'a>(&self, path: &'a str) -> &'a str {
        self.root_prefix
            .as_deref()
            .and_then(|prefix| path.strip_prefix(prefix))
            .unwrap_or(path)
    }
}
