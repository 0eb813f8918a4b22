//! Settings persistence - one JSON record read at startup, rewritten on change.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::config::SearchConfig;
use crate::error::{Result, SearchError};

pub const SETTINGS_FILENAME: &str = "settings.json";
pub const SETTINGS_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsRecord {
    version: u32,
    search: SearchConfig,
}

/// Returns the per-user default settings file.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("searchmate").join(SETTINGS_FILENAME))
}

/// Loads settings from `path`, writing defaults if the file does not exist.
///
/// A malformed or out-of-range record is logged and replaced by defaults in
/// memory; the file on disk is left for the user to inspect.
pub fn load_or_create_settings(path: &Path) -> Result<SearchConfig> {
    if !path.exists() {
        let config = SearchConfig::default();
        write_settings(path, &config)?;
        return Ok(config);
    }

    let data = fs::read_to_string(path).map_err(|error| {
        SearchError::Internal(format!(
            "failed to read settings {}: {error}",
            path.display()
        ))
    })?;

    let record: SettingsRecord = match serde_json::from_str(&data) {
        Ok(record) => record,
        Err(error) => {
            log::warn!(
                "settings {} unreadable, using defaults: {}",
                path.display(),
                error
            );
            return Ok(SearchConfig::default());
        }
    };

    if record.version != SETTINGS_VERSION {
        log::warn!(
            "settings {} has version {}, expected {}; using defaults",
            path.display(),
            record.version,
            SETTINGS_VERSION
        );
        return Ok(SearchConfig::default());
    }
    if let Err(error) = record.search.validate() {
        log::warn!("settings {} rejected, using defaults: {}", path.display(), error);
        return Ok(SearchConfig::default());
    }

    Ok(record.search)
}

/// Writes `config` to `path`, creating the parent directory if needed.
pub fn write_settings(path: &Path, config: &SearchConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            SearchError::Internal(format!(
                "failed to create settings directory {}: {error}",
                parent.display()
            ))
        })?;
    }

    let record = SettingsRecord {
        version: SETTINGS_VERSION,
        search: config.clone(),
    };
    let data = serde_json::to_string_pretty(&record).map_err(|error| {
        SearchError::Serialization(format!("failed to serialize settings: {error}"))
    })?;
    fs::write(path, data).map_err(|error| {
        SearchError::Internal(format!(
            "failed to write settings {}: {error}",
            path.display()
        ))
    })?;
    Ok(())
}
