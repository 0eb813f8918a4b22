//! Normalized cache keys and their on-disk file names.

use std::hash::Hasher;
use std::path::{Path, PathBuf};

use fnv::FnvHasher;

/// Replaces whitespace runs in normalized keys.
pub const KEY_SEPARATOR: char = '_';

/// File name suffix shared by every cache record.
pub const RECORD_SUFFIX: &str = ".bin.zst";

/// Longest slug kept in a record file name.
const SLUG_MAX_LEN: usize = 48;

/// Storage key for a query: lower-cased, with whitespace runs collapsed into
/// [`KEY_SEPARATOR`].
///
/// Two queries that differ only in case or incidental spacing map to the same key.
/// The key also carries the walk pattern the query searches for, since distinct
/// patterns (`"report old"` and `"report_old"`) can share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    pattern: String,
}

impl CacheKey {
    pub fn from_query(text: &str) -> Self {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        Self {
            key: words.join(&KEY_SEPARATOR.to_string()),
            pattern: words.join(" "),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Lower-cased substring the query matches, with whitespace runs collapsed
    /// into single spaces.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the record file name for this key.
    ///
    /// The readable slug alone is lossy (unsafe characters are replaced and long
    /// keys are cut), so a fingerprint of the full key keeps distinct keys apart.
    pub fn file_name(&self) -> String {
        format!("{}-{}{}", self.slug(), self.fingerprint(), RECORD_SUFFIX)
    }

    /// Returns the record path for this key inside `cache_dir`.
    pub fn record_path(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(self.file_name())
    }

    fn slug(&self) -> String {
        self.key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .take(SLUG_MAX_LEN)
            .collect()
    }

    fn fingerprint(&self) -> String {
        let mut hasher = FnvHasher::default();
        hasher.write(self.key.as_bytes());
        format!("{:016x}", hasher.finish())
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}
