//! Search-as-you-type file discovery across mounted volumes.
//!
//! This crate provides the search core:
//! - Parallel substring walk over every search root under a shared result cap
//! - A disk-resident result cache with expiry and capacity eviction
//! - Debounced query scheduling for keystroke-driven callers
//! - Projection of user settings onto the components above

pub mod cache;
pub mod cancel;
pub mod error;
pub mod search;
pub mod settings;
pub mod types;
pub mod walk;

// Re-export main types
pub use cache::{CacheKey, CachePolicy, CacheStore, MaintenanceReport};
pub use cancel::GenerationTracker;
pub use error::{Result, SearchError};
pub use search::{
    QueryScheduler, Resolution, ResultOrigin, Resolver, SearchEvent, SearchOrchestrator,
    SearchService, SearchTunables, QUERY_DEBOUNCE_DELAY,
};
pub use settings::{
    load_or_create_settings, write_settings, SearchConfig, SettingsDraft, SettingsProjection,
};
pub use types::{Query, ResultSet};
pub use walk::{PathWalker, SearchRoots, WalkSummary};
