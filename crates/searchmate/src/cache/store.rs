//! File-backed result cache with expiry and capacity eviction.
//!
//! Each record lives in its own file; the file modification time is the only
//! "last touched" signal, used both for expiry and for least-recently-used
//! eviction. No separate metadata index is kept.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use super::key::{CacheKey, RECORD_SUFFIX};
use super::record::{read_record, write_record, CacheRecord, CACHE_RECORD_VERSION};
use crate::error::{Result, SearchError};
use crate::types::ResultSet;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Returns the per-user default directory for cache records.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("searchmate").join("results"))
}

/// Limits enforced by the maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Maximum number of records kept. Zero disables capacity eviction.
    pub max_entries: usize,
    /// Records untouched for longer than this are expired. `None` disables expiry.
    pub expiration: Option<Duration>,
}

impl CachePolicy {
    pub fn new(max_entries: usize, expiration_days: Option<u32>) -> Self {
        Self {
            max_entries,
            expiration: expiration_days
                .filter(|days| *days > 0)
                .map(|days| Duration::from_secs(u64::from(days) * SECS_PER_DAY)),
        }
    }
}

/// Outcome of one maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired: usize,
    pub evicted: usize,
}

/// A record file found in the cache directory.
#[derive(Debug)]
struct RecordFile {
    path: PathBuf,
    touched: SystemTime,
}

/// Durable map from normalized query keys to result sets.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    policy: RwLock<CachePolicy>,
}

impl CacheStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>, policy: CachePolicy) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| SearchError::CacheDirUnavailable {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            policy: RwLock::new(policy),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn policy(&self) -> CachePolicy {
        *self.policy.read()
    }

    /// Replaces the limits used by subsequent maintenance passes.
    pub fn set_policy(&self, policy: CachePolicy) {
        *self.policy.write() = policy;
    }

    /// Loads the result set stored for `key`.
    ///
    /// A successful load touches the record so it counts as recently used.
    /// Missing, corrupt or foreign records all read as `None`.
    pub fn try_load(&self, key: &CacheKey) -> Option<ResultSet> {
        let path = key.record_path(&self.dir);
        let record = read_record(&path)?;

        if record.version != CACHE_RECORD_VERSION {
            log::debug!(
                "cache record version mismatch for {}: {} != {}",
                path.display(),
                record.version,
                CACHE_RECORD_VERSION
            );
            return None;
        }
        if record.key != key.as_str() {
            log::debug!(
                "cache record key mismatch for {}: {:?} != {:?}",
                path.display(),
                record.key,
                key.as_str()
            );
            return None;
        }
        if record.pattern != key.pattern() {
            log::debug!(
                "cache record pattern mismatch for {}: {:?} != {:?}",
                path.display(),
                record.pattern,
                key.pattern()
            );
            return None;
        }

        touch(&path);
        Some(record.into_result_set())
    }

    /// Persists `results` under `key`, replacing any earlier record.
    ///
    /// Runs a maintenance pass first. Empty result sets are never stored.
    pub fn save(&self, key: &CacheKey, results: &ResultSet) -> Result<()> {
        if results.is_empty() {
            return Ok(());
        }

        let report = self.run_maintenance();
        let path = key.record_path(&self.dir);
        write_record(&path, &CacheRecord::new(key, results))?;

        log::debug!(
            "cache saved key={} paths={} expired={} evicted={}",
            key,
            results.len(),
            report.expired,
            report.evicted
        );
        Ok(())
    }

    /// Removes a single path from the record stored for `key`.
    ///
    /// The record is rewritten even if it becomes empty. Returns whether the
    /// path was present.
    pub fn remove_entry(&self, key: &CacheKey, path: &str) -> Result<bool> {
        let record_path = key.record_path(&self.dir);
        let Some(record) = read_record(&record_path) else {
            return Ok(false);
        };
        if record.version != CACHE_RECORD_VERSION
            || record.key != key.as_str()
            || record.pattern != key.pattern()
        {
            return Ok(false);
        }

        let mut results = record.into_result_set();
        if !results.remove(path) {
            return Ok(false);
        }
        write_record(&record_path, &CacheRecord::new(key, &results))?;
        Ok(true)
    }

    /// Deletes every record. Returns the number of records removed.
    pub fn clear_all(&self) -> Result<usize> {
        let mut removed = 0;
        for record in list_records(&self.dir) {
            remove_record_file(&record.path)?;
            removed += 1;
        }
        if removed > 0 {
            log::info!("cache cleared dir={} removed={}", self.dir.display(), removed);
        }
        Ok(removed)
    }

    /// Returns the number of records currently on disk.
    pub fn len(&self) -> usize {
        list_records(&self.dir).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expires old records, then evicts the least recently touched ones until
    /// there is room for one more record.
    ///
    /// Failures are logged; a failed eviction stops the pass.
    pub fn run_maintenance(&self) -> MaintenanceReport {
        let policy = self.policy();
        let mut records = list_records(&self.dir);
        let mut report = MaintenanceReport::default();

        if let Some(horizon) = policy.expiration {
            let now = SystemTime::now();
            records.retain(|record| {
                let expired = now
                    .duration_since(record.touched)
                    .map(|age| age > horizon)
                    .unwrap_or(false);
                if !expired {
                    return true;
                }
                match remove_record_file(&record.path) {
                    Ok(()) => {
                        report.expired += 1;
                        false
                    }
                    Err(error) => {
                        log::warn!(
                            "cache expiry failed for {}: {}",
                            record.path.display(),
                            error
                        );
                        true
                    }
                }
            });
        }

        if policy.max_entries > 0 {
            let mut remaining = records.len();
            for record in &records {
                if remaining < policy.max_entries {
                    break;
                }
                if let Err(error) = remove_record_file(&record.path) {
                    log::warn!(
                        "cache eviction failed for {}: {}",
                        record.path.display(),
                        error
                    );
                    break;
                }
                remaining -= 1;
                report.evicted += 1;
            }
        }

        if report != MaintenanceReport::default() {
            log::debug!(
                "cache maintenance dir={} expired={} evicted={}",
                self.dir.display(),
                report.expired,
                report.evicted
            );
        }
        report
    }
}

/// Lists record files ordered oldest-touched first.
fn list_records(dir: &Path) -> Vec<RecordFile> {
    let read_dir = match fs::read_dir(dir) {
        Ok(iter) => iter,
        Err(error) => {
            if error.kind() != ErrorKind::NotFound {
                log::warn!("cache listing failed for {}: {}", dir.display(), error);
            }
            return Vec::new();
        }
    };

    let mut records: Vec<RecordFile> = read_dir
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(RECORD_SUFFIX))
        .filter_map(|entry| {
            // The record may vanish between listing and stat; skip it then.
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            Some(RecordFile {
                path: entry.path(),
                touched: metadata.modified().unwrap_or(UNIX_EPOCH),
            })
        })
        .collect();

    records.sort_by(|a, b| a.touched.cmp(&b.touched).then_with(|| a.path.cmp(&b.path)));
    records
}

fn remove_record_file(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

/// Bumps the record's modification time to now.
fn touch(path: &Path) {
    let result = OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|file| file.set_modified(SystemTime::now()));
    if let Err(error) = result {
        log::debug!("cache touch failed for {}: {}", path.display(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn result_set(paths: &[&str]) -> ResultSet {
        paths.iter().map(|path| path.to_string()).collect()
    }

    fn set_age(store: &CacheStore, key: &CacheKey, age: Duration) {
        let file = OpenOptions::new()
            .write(true)
            .open(key.record_path(store.dir()))
            .unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    fn touched_at(store: &CacheStore, key: &CacheKey) -> SystemTime {
        fs::metadata(key.record_path(store.dir()))
            .unwrap()
            .modified()
            .unwrap()
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        let key = CacheKey::from_query("report");
        let results = result_set(&["/root/x/report.txt", "/root/y/report_old.txt"]);

        store.save(&key, &results).unwrap();
        assert_eq!(store.try_load(&key), Some(results));
    }

    #[test]
    fn equal_queries_share_a_record() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        let results = result_set(&["/a/My Notes.txt"]);

        store
            .save(&CacheKey::from_query("My  Notes"), &results)
            .unwrap();
        assert_eq!(
            store.try_load(&CacheKey::from_query("my notes")),
            Some(results)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn record_for_another_pattern_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        let joined = CacheKey::from_query("report_old");
        let spaced = CacheKey::from_query("report old");
        store
            .save(&joined, &result_set(&["/docs/report_old.txt"]))
            .unwrap();

        assert!(store.try_load(&spaced).is_none());
        assert!(!store
            .remove_entry(&spaced, "/docs/report_old.txt")
            .unwrap());
        assert_eq!(store.try_load(&joined).unwrap().len(), 1);
    }

    #[test]
    fn empty_result_set_is_not_saved() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        let key = CacheKey::from_query("nothing");

        store.save(&key, &ResultSet::new()).unwrap();
        assert!(store.is_empty());
        assert!(store.try_load(&key).is_none());
    }

    #[test]
    fn missing_record_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        assert!(store.try_load(&CacheKey::from_query("absent")).is_none());
    }

    #[test]
    fn corrupt_record_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        let key = CacheKey::from_query("broken");
        fs::write(key.record_path(store.dir()), b"garbage").unwrap();

        assert!(store.try_load(&key).is_none());
    }

    #[test]
    fn load_touches_record() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        let key = CacheKey::from_query("touch");
        store.save(&key, &result_set(&["/t/touch.txt"])).unwrap();
        set_age(&store, &key, Duration::from_secs(3600));
        let before = touched_at(&store, &key);

        store.try_load(&key).unwrap();
        assert!(touched_at(&store, &key) > before);
    }

    #[test]
    fn clear_all_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        store
            .save(&CacheKey::from_query("one"), &result_set(&["/1"]))
            .unwrap();
        store
            .save(&CacheKey::from_query("two"), &result_set(&["/2"]))
            .unwrap();

        assert_eq!(store.clear_all().unwrap(), 2);
        assert_eq!(store.clear_all().unwrap(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn clear_all_leaves_unrelated_files() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        File::create(temp.path().join("README")).unwrap();
        store
            .save(&CacheKey::from_query("one"), &result_set(&["/1"]))
            .unwrap();

        store.clear_all().unwrap();
        assert!(temp.path().join("README").exists());
    }

    #[test]
    fn capacity_evicts_least_recently_touched() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::new(3, None)).unwrap();
        let keys: Vec<CacheKey> = (0..5)
            .map(|i| CacheKey::from_query(&format!("key{i}")))
            .collect();

        for (i, key) in keys.iter().enumerate() {
            store
                .save(key, &result_set(&[&format!("/data/key{i}.txt")]))
                .unwrap();
            // Older keys get older timestamps.
            set_age(&store, key, Duration::from_secs(100 - i as u64 * 10));
        }

        assert!(store.try_load(&keys[0]).is_none());
        assert!(store.try_load(&keys[1]).is_none());
        for key in &keys[2..] {
            assert!(store.try_load(key).is_some(), "{key} should remain");
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn recently_loaded_record_survives_eviction() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::new(2, None)).unwrap();
        let old = CacheKey::from_query("old");
        let newer = CacheKey::from_query("newer");

        store.save(&old, &result_set(&["/old"])).unwrap();
        set_age(&store, &old, Duration::from_secs(200));
        store.save(&newer, &result_set(&["/newer"])).unwrap();
        set_age(&store, &newer, Duration::from_secs(100));

        // Loading makes "old" the most recently touched record.
        store.try_load(&old).unwrap();
        store
            .save(&CacheKey::from_query("third"), &result_set(&["/third"]))
            .unwrap();

        assert!(store.try_load(&old).is_some());
        assert!(store.try_load(&newer).is_none());
    }

    #[test]
    fn expired_records_are_removed_regardless_of_capacity() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::new(100, Some(1))).unwrap();
        let stale = CacheKey::from_query("stale");
        let fresh = CacheKey::from_query("fresh");

        store.save(&stale, &result_set(&["/stale"])).unwrap();
        set_age(&store, &stale, Duration::from_secs(2 * SECS_PER_DAY));
        store.save(&fresh, &result_set(&["/fresh"])).unwrap();

        assert!(store.try_load(&stale).is_none());
        assert!(store.try_load(&fresh).is_some());
    }

    #[test]
    fn expiry_disabled_keeps_old_records() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::new(100, None)).unwrap();
        let stale = CacheKey::from_query("stale");

        store.save(&stale, &result_set(&["/stale"])).unwrap();
        set_age(&store, &stale, Duration::from_secs(30 * SECS_PER_DAY));

        assert_eq!(store.run_maintenance(), MaintenanceReport::default());
        assert!(store.try_load(&stale).is_some());
    }

    #[test]
    fn maintenance_expires_before_evicting() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::new(2, None)).unwrap();
        let stale = CacheKey::from_query("stale");
        let alpha = CacheKey::from_query("alpha");

        store.save(&stale, &result_set(&["/stale"])).unwrap();
        set_age(&store, &stale, Duration::from_secs(3 * SECS_PER_DAY));
        store.save(&alpha, &result_set(&["/alpha"])).unwrap();
        set_age(&store, &alpha, Duration::from_secs(60));

        store.set_policy(CachePolicy::new(2, Some(1)));
        let report = store.run_maintenance();

        // Expiry already made room, so nothing is evicted.
        assert_eq!(report, MaintenanceReport { expired: 1, evicted: 0 });
        assert!(store.try_load(&alpha).is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn set_policy_applies_to_next_pass() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        for i in 0..4 {
            let key = CacheKey::from_query(&format!("q{i}"));
            store.save(&key, &result_set(&["/q"])).unwrap();
            set_age(&store, &key, Duration::from_secs(100 - i * 10));
        }

        store.set_policy(CachePolicy::new(2, None));
        let report = store.run_maintenance();
        assert_eq!(report.evicted, 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_entry_drops_only_named_path() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        let key = CacheKey::from_query("report");
        let other = CacheKey::from_query("invoice");
        store
            .save(&key, &result_set(&["/x/report.txt", "/y/report_old.txt"]))
            .unwrap();
        store.save(&other, &result_set(&["/x/invoice.pdf"])).unwrap();

        assert!(store.remove_entry(&key, "/y/report_old.txt").unwrap());
        assert_eq!(store.try_load(&key), Some(result_set(&["/x/report.txt"])));
        assert_eq!(
            store.try_load(&other),
            Some(result_set(&["/x/invoice.pdf"]))
        );
    }

    #[test]
    fn remove_last_entry_keeps_empty_record() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        let key = CacheKey::from_query("single");
        store.save(&key, &result_set(&["/only"])).unwrap();

        assert!(store.remove_entry(&key, "/only").unwrap());
        assert_eq!(store.try_load(&key), Some(ResultSet::new()));
    }

    #[test]
    fn remove_entry_for_unknown_key_or_path_is_noop() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path(), CachePolicy::default()).unwrap();
        let key = CacheKey::from_query("known");
        store.save(&key, &result_set(&["/known"])).unwrap();

        assert!(!store
            .remove_entry(&CacheKey::from_query("unknown"), "/known")
            .unwrap());
        assert!(!store.remove_entry(&key, "/elsewhere").unwrap());
    }

    #[test]
    fn open_fails_when_dir_is_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        File::create(&blocker).unwrap();

        let error = CacheStore::open(blocker.join("cache"), CachePolicy::default())
            .expect_err("cache dir under a file cannot be created");
        assert!(matches!(error, SearchError::CacheDirUnavailable { .. }));
    }
}
