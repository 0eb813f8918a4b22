//! Mapping of user settings onto component tunables.

use super::config::SearchConfig;
use crate::cache::CachePolicy;

/// The tunables a [`SearchConfig`] implies for the orchestrator and cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsProjection {
    /// Result cap for a live walk.
    pub max_results: usize,
    pub cache_enabled: bool,
    pub cache_policy: CachePolicy,
}

impl SettingsProjection {
    pub fn from_config(config: &SearchConfig) -> Self {
        let expiration_days = config
            .auto_clean_enabled
            .then_some(config.expiration_days);
        Self {
            max_results: config.max_results as usize,
            cache_enabled: config.cache_enabled,
            cache_policy: CachePolicy::new(config.max_cache_entries as usize, expiration_days),
        }
    }
}
