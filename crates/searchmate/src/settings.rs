//! User-configurable limits.
//!
//! - `config` - The validated configuration record and raw form input
//! - `file` - Loading and saving the single settings record
//! - `projection` - Mapping settings onto orchestrator and cache tunables

mod config;
mod file;
mod projection;

// Re-export main types
pub use config::{SearchConfig, SettingsDraft, ALLOWED_MAX_RESULTS};
pub use file::{
    default_settings_path, load_or_create_settings, write_settings, SETTINGS_FILENAME,
    SETTINGS_VERSION,
};
pub use projection::SettingsProjection;
