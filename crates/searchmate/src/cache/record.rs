//! Cache record encoding - postcard payload compressed with zstd.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::key::CacheKey;
use crate::error::{Result, SearchError};
use crate::types::ResultSet;

/// Record format version - increment when changing the format.
pub const CACHE_RECORD_VERSION: u32 = 2;

const ZSTD_LEVEL: i32 = 3;

/// Persisted form of one cached result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Record format version.
    pub version: u32,
    /// Normalized query key the record belongs to.
    pub key: String,
    /// Walk pattern that produced the paths.
    pub pattern: String,
    /// Unix timestamp when the record was written.
    pub saved_at: u64,
    /// Matching paths.
    pub paths: Vec<String>,
}

impl CacheRecord {
    pub fn new(key: &CacheKey, results: &ResultSet) -> Self {
        Self {
            version: CACHE_RECORD_VERSION,
            key: key.as_str().to_string(),
            pattern: key.pattern().to_string(),
            saved_at: unix_now_secs(),
            paths: results.iter().cloned().collect(),
        }
    }

    pub fn into_result_set(self) -> ResultSet {
        self.paths.into_iter().collect()
    }
}

/// Writes a record atomically (temp file in the same directory + rename).
pub(super) fn write_record(path: &Path, record: &CacheRecord) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        SearchError::Internal(format!("cache record has no parent: {}", path.display()))
    })?;

    let encoded = postcard::to_stdvec(record).map_err(|error| {
        SearchError::Serialization(format!("failed to encode cache record: {error}"))
    })?;
    let compressed = zstd::encode_all(encoded.as_slice(), ZSTD_LEVEL).map_err(|error| {
        SearchError::Serialization(format!("failed to compress cache record: {error}"))
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|error| {
        SearchError::Internal(format!(
            "failed to create temp file in {}: {error}",
            dir.display()
        ))
    })?;
    tmp.write_all(&compressed)?;
    tmp.persist(path).map_err(|error| {
        SearchError::Internal(format!(
            "failed to finalize cache record {}: {}",
            path.display(),
            error.error
        ))
    })?;
    Ok(())
}

/// Reads a record, returning `None` for a missing or undecodable file.
///
/// Corruption is logged and otherwise treated like a missing record.
pub(super) fn read_record(path: &Path) -> Option<CacheRecord> {
    let compressed = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == ErrorKind::NotFound => return None,
        Err(error) => {
            log::warn!("cache record read failed for {}: {}", path.display(), error);
            return None;
        }
    };

    let encoded = match zstd::decode_all(compressed.as_slice()) {
        Ok(bytes) => bytes,
        Err(error) => {
            log::warn!(
                "cache record decompress failed for {}: {}",
                path.display(),
                error
            );
            return None;
        }
    };

    match postcard::from_bytes::<CacheRecord>(&encoded) {
        Ok(record) => Some(record),
        Err(error) => {
            log::warn!("cache record decode failed for {}: {}", path.display(), error);
            None
        }
    }
}

/// Returns the current Unix timestamp in seconds.
pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_secs())
        .unwrap_or(0)
}
