//! Identity hashing for error deduplication.
//!
//! Two log lines describe "the same error" when their severity, message,
//! source file and source line are all equal. The identity hash folds those
//! four fields into a fixed-width key used as the aggregate primary key.

use crate::models::{ErrorRecord, IdentityHash};
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest (128 bits).
pub const IDENTITY_HASH_LEN: usize = 32;

/// Field separator fed to the digest between components.
///
/// Keeps `("ab", "c")` and `("a", "bc")` apart. The unit separator never
/// appears in a single log line.
const FIELD_SEPARATOR: &[u8] = b"\x1f";

/// Identity hasher for error records.
///
/// Pure and deterministic. Fields are hashed verbatim, without normalization,
/// in the fixed order severity, message, file, line. Collisions on the
/// truncated digest are an accepted trade-off.
///
/// # Example
///
/// ```rust
/// use silent_witness::{ErrorRecord, IdentityHasher};
///
/// let a = ErrorRecord::new("Warning", "Undefined variable $x", "foo.php", 10);
/// let b = ErrorRecord::new("Warning", "Undefined variable $x", "foo.php", 10);
/// assert_eq!(IdentityHasher::hash(&a), IdentityHasher::hash(&b));
/// assert_eq!(IdentityHasher::hash(&a).as_str().len(), 32);
/// ```
pub struct IdentityHasher;

impl IdentityHasher {
    /// Computes the identity hash of a record.
    #[must_use]
    pub fn hash(record: &ErrorRecord) -> IdentityHash {
        let mut hasher = Sha256::new();
        hasher.update(record.severity.as_bytes());
        hasher.update(FIELD_SEPARATOR);
        hasher.update(record.message.as_bytes());
        hasher.update(FIELD_SEPARATOR);
        hasher.update(record.source_file.as_bytes());
        hasher.update(FIELD_SEPARATOR);
        hasher.update(record.source_line.to_string().as_bytes());

        let mut hex = hex::encode(hasher.finalize());
        hex.truncate(IDENTITY_HASH_LEN);
        IdentityHash::new(hex)
    }
}
