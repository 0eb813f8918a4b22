//! Disk-resident result cache.
//!
//! This module handles persisting result sets between sessions:
//! - Normalizing query text into stable storage keys
//! - Encoding records with postcard and zstd
//! - Expiring and evicting records by their last-touched time

mod key;
mod record;
mod store;

// Re-export main types
pub use key::{CacheKey, KEY_SEPARATOR, RECORD_SUFFIX};
pub use record::{CacheRecord, CACHE_RECORD_VERSION};
pub use store::{default_cache_dir, CachePolicy, CacheStore, MaintenanceReport};
