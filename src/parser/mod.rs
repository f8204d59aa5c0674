//! Log line parsing.
//!
//! Turns one raw PHP error-log line into an [`ErrorRecord`](crate::ErrorRecord)
//! or reports "no match". The grammar is the one PHP writes to `error_log`:
//!
//! ```text
//! [12-Feb-2026 08:00:00 UTC] PHP Warning:  Undefined variable $x in /var/www/a.php on line 10
//! └──── timestamp ─────────┘ └┬┘ └─sev─┘  └──── message ──────┘    └─ file ───┘         └line┘
//!                          engine tag
//! ```
//!
//! Matching is all-or-nothing and anchored at the start of the line. Lines that
//! do not match (stack traces, continuation lines, foreign output) are skipped
//! silently by the caller.

mod line;

pub use line::LineParser;
