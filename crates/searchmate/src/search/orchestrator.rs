//! SearchOrchestrator - cache-first query resolution.

use std::path::Path;

use parking_lot::RwLock;

use super::scheduler::Resolver;
use crate::cache::CacheStore;
use crate::error::Result;
use crate::settings::{SearchConfig, SettingsProjection};
use crate::types::{Query, ResultSet, MIN_QUERY_LEN};
use crate::walk::{PathWalker, SearchRoots, WalkSummary};

/// Limits the orchestrator applies to every resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTunables {
    pub max_results: usize,
    pub cache_enabled: bool,
    /// Shorter trimmed queries resolve to nothing without touching the disk.
    pub min_query_len: usize,
}

impl Default for SearchTunables {
    fn default() -> Self {
        Self {
            max_results: 1000,
            cache_enabled: true,
            min_query_len: MIN_QUERY_LEN,
        }
    }
}

impl SearchTunables {
    pub fn from_projection(projection: &SettingsProjection, min_query_len: usize) -> Self {
        Self {
            max_results: projection.max_results,
            cache_enabled: projection.cache_enabled,
            min_query_len,
        }
    }
}

/// Where a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    /// The query was too short to search.
    Skipped,
    Cache,
    Walk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub results: ResultSet,
    pub origin: ResultOrigin,
    /// Statistics of the live walk, if one ran.
    pub walk: Option<WalkSummary>,
}

/// Resolves queries against the cache, falling back to a live walk.
#[derive(Debug)]
pub struct SearchOrchestrator {
    walker: PathWalker,
    roots: SearchRoots,
    /// `None` when the cache directory could not be opened.
    cache: Option<CacheStore>,
    tunables: RwLock<SearchTunables>,
}

impl SearchOrchestrator {
    pub fn new(
        walker: PathWalker,
        roots: SearchRoots,
        cache: Option<CacheStore>,
        tunables: SearchTunables,
    ) -> Self {
        Self {
            walker,
            roots,
            cache,
            tunables: RwLock::new(tunables),
        }
    }

    /// Builds an orchestrator from user settings, opening the cache at `cache_dir`.
    ///
    /// If the cache directory cannot be created, caching stays disabled for
    /// the lifetime of this orchestrator.
    pub fn open(
        walker: PathWalker,
        roots: SearchRoots,
        cache_dir: &Path,
        config: &SearchConfig,
        min_query_len: usize,
    ) -> Self {
        let projection = SettingsProjection::from_config(config);
        let cache = match CacheStore::open(cache_dir, projection.cache_policy) {
            Ok(cache) => Some(cache),
            Err(error) => {
                log::warn!("result cache disabled for this session: {}", error);
                None
            }
        };
        let tunables = SearchTunables::from_projection(&projection, min_query_len);
        Self::new(walker, roots, cache, tunables)
    }

    pub fn tunables(&self) -> SearchTunables {
        *self.tunables.read()
    }

    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    /// Returns the store if caching is both available and enabled.
    fn active_cache(&self, tunables: &SearchTunables) -> Option<&CacheStore> {
        self.cache.as_ref().filter(|_| tunables.cache_enabled)
    }

    pub fn resolve(&self, text: &str) -> ResultSet {
        self.resolve_detailed(text).results
    }

    /// Resolves `text` and reports whether the results came from the cache.
    ///
    /// Never fails: walk errors are contained per directory and cache
    /// failures degrade to a miss or a skipped write.
    pub fn resolve_detailed(&self, text: &str) -> Resolution {
        let query = Query::new(text);
        let tunables = self.tunables();
        if !query.is_eligible(tunables.min_query_len) {
            return Resolution {
                results: ResultSet::new(),
                origin: ResultOrigin::Skipped,
                walk: None,
            };
        }

        let key = query.cache_key();
        let cache = self.active_cache(&tunables);

        if let Some(cache) = cache {
            match cache.try_load(&key) {
                Some(mut results) => {
                    let dropped = results.retain_existing();
                    if !results.is_empty() {
                        results.truncate(tunables.max_results);
                        log::debug!(
                            "cache hit key={} paths={} dropped={}",
                            key,
                            results.len(),
                            dropped
                        );
                        return Resolution {
                            results,
                            origin: ResultOrigin::Cache,
                            walk: None,
                        };
                    }
                    log::debug!("cache fallthrough key={} dropped={}", key, dropped);
                }
                None => log::debug!("cache miss key={}", key),
            }
        }

        let roots = self.roots.resolve();
        let (mut results, summary) =
            self.walker.walk(&roots, &query.pattern(), tunables.max_results);
        results.truncate(tunables.max_results);

        log::info!(
            "walk query={:?} roots={} matches={} kept={} dirs={} errors={} capped={} elapsed_ms={}",
            query.trimmed(),
            summary.roots,
            summary.matches,
            results.len(),
            summary.dirs_scanned,
            summary.errors,
            summary.capped,
            summary.elapsed.as_millis()
        );

        if let Some(cache) = cache {
            if let Err(error) = cache.save(&key, &results) {
                log::warn!("cache write failed key={}: {}", key, error);
            }
        }

        Resolution {
            results,
            origin: ResultOrigin::Walk,
            walk: Some(summary),
        }
    }

    /// Applies confirmed user settings.
    ///
    /// Turning caching off deletes every stored record.
    pub fn apply_settings(&self, config: &SearchConfig) {
        let projection = SettingsProjection::from_config(config);
        let was_enabled = {
            let mut tunables = self.tunables.write();
            let was_enabled = tunables.cache_enabled;
            tunables.max_results = projection.max_results;
            tunables.cache_enabled = projection.cache_enabled;
            was_enabled
        };

        if let Some(cache) = &self.cache {
            cache.set_policy(projection.cache_policy);
            if was_enabled && !projection.cache_enabled {
                match cache.clear_all() {
                    Ok(removed) => log::info!("cache disabled, removed={}", removed),
                    Err(error) => log::warn!("cache disabled but clear failed: {}", error),
                }
            }
        }

        log::info!(
            "settings applied max_results={} cache_enabled={} max_entries={} expiration_days={:?}",
            projection.max_results,
            projection.cache_enabled,
            projection.cache_policy.max_entries,
            config.auto_clean_enabled.then_some(config.expiration_days)
        );
    }

    /// Drops `path` from the cached results of `text`.
    ///
    /// Returns whether a cached record contained the path.
    pub fn remove_stale_path(&self, text: &str, path: &str) -> Result<bool> {
        let tunables = self.tunables();
        let Some(cache) = self.active_cache(&tunables) else {
            return Ok(false);
        };
        let key = Query::new(text).cache_key();
        let removed = cache.remove_entry(&key, path)?;
        if removed {
            log::debug!("cache removed stale path key={} path={}", key, path);
        }
        Ok(removed)
    }

    /// Deletes every cached record. Returns the number removed.
    pub fn clear_cache(&self) -> Result<usize> {
        match &self.cache {
            Some(cache) => cache.clear_all(),
            None => Ok(0),
        }
    }
}

impl Resolver for SearchOrchestrator {
    fn resolve(&self, text: &str) -> ResultSet {
        SearchOrchestrator::resolve(self, text)
    }
}
