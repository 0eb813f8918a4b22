use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// Result caps a user can pick from.
pub const ALLOWED_MAX_RESULTS: [u32; 4] = [500, 1000, 2000, 5000];

/// Search and cache limits chosen by the user.
///
/// Values reaching the core are always positive; [`SettingsDraft::validate`]
/// is the boundary where raw input is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    pub max_results: u32,
    pub cache_enabled: bool,
    pub auto_clean_enabled: bool,
    pub expiration_days: u32,
    pub max_cache_entries: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 1000,
            cache_enabled: true,
            auto_clean_enabled: true,
            expiration_days: 7,
            max_cache_entries: 100,
        }
    }
}

impl SearchConfig {
    /// Checks that every limit is positive.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("max_results", self.max_results),
            ("expiration_days", self.expiration_days),
            ("max_cache_entries", self.max_cache_entries),
        ] {
            if value == 0 {
                return Err(SearchError::InvalidSetting {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Settings as entered in a form, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDraft {
    /// Picked from [`ALLOWED_MAX_RESULTS`].
    pub max_results: u32,
    pub max_cache_entries: String,
    pub expiration_days: String,
    pub cache_enabled: bool,
    pub auto_clean_enabled: bool,
}

impl SettingsDraft {
    /// Pre-fills a draft with the current settings.
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            max_results: config.max_results,
            max_cache_entries: config.max_cache_entries.to_string(),
            expiration_days: config.expiration_days.to_string(),
            cache_enabled: config.cache_enabled,
            auto_clean_enabled: config.auto_clean_enabled,
        }
    }

    /// Validates the draft into a config.
    ///
    /// Fields disabled in the form (cache limits while caching is off,
    /// expiration while auto-clean is off) are not parsed and keep their
    /// values from `previous`.
    pub fn validate(&self, previous: &SearchConfig) -> Result<SearchConfig> {
        if !ALLOWED_MAX_RESULTS.contains(&self.max_results) {
            return Err(SearchError::InvalidSetting {
                field: "max_results",
                value: self.max_results.to_string(),
            });
        }

        let max_cache_entries = if self.cache_enabled {
            parse_positive("max_cache_entries", &self.max_cache_entries)?
        } else {
            previous.max_cache_entries
        };
        let expiration_days = if self.cache_enabled && self.auto_clean_enabled {
            parse_positive("expiration_days", &self.expiration_days)?
        } else {
            previous.expiration_days
        };

        Ok(SearchConfig {
            max_results: self.max_results,
            cache_enabled: self.cache_enabled,
            auto_clean_enabled: self.auto_clean_enabled,
            expiration_days,
            max_cache_entries,
        })
    }
}

fn parse_positive(field: &'static str, raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(SearchError::InvalidSetting {
            field,
            value: raw.to_string(),
        }),
    }
}
