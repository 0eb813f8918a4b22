//! SearchService - the surface a presentation layer talks to.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::UnboundedReceiver;

use super::orchestrator::SearchOrchestrator;
use super::scheduler::{QueryScheduler, Resolver, SearchEvent, QUERY_DEBOUNCE_DELAY};
use crate::error::Result;
use crate::settings::{write_settings, SearchConfig};
use crate::types::ResultSet;

pub struct SearchService {
    orchestrator: Arc<SearchOrchestrator>,
    scheduler: QueryScheduler,
    events: Mutex<Option<UnboundedReceiver<SearchEvent>>>,
    config: RwLock<SearchConfig>,
    settings_path: Option<PathBuf>,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("orchestrator", &self.orchestrator)
            .field("scheduler", &self.scheduler)
            .field("config", &*self.config.read())
            .field("settings_path", &self.settings_path)
            .finish()
    }
}

impl SearchService {
    /// Must be called within a tokio runtime.
    pub fn new(orchestrator: Arc<SearchOrchestrator>, config: SearchConfig) -> Self {
        Self::with_debounce(orchestrator, config, QUERY_DEBOUNCE_DELAY)
    }

    pub fn with_debounce(
        orchestrator: Arc<SearchOrchestrator>,
        config: SearchConfig,
        delay: Duration,
    ) -> Self {
        let resolver: Arc<dyn Resolver> = orchestrator.clone();
        let (scheduler, events) = QueryScheduler::new(resolver, delay);
        Self {
            orchestrator,
            scheduler,
            events: Mutex::new(Some(events)),
            config: RwLock::new(config),
            settings_path: None,
        }
    }

    /// Persists every applied config to `path`.
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn orchestrator(&self) -> &Arc<SearchOrchestrator> {
        &self.orchestrator
    }

    pub fn config(&self) -> SearchConfig {
        self.config.read().clone()
    }

    /// Takes the scheduler's event stream. Only the first caller receives it.
    pub fn subscribe(&self) -> Option<UnboundedReceiver<SearchEvent>> {
        self.events.lock().take()
    }

    /// Resolves immediately on the calling thread, bypassing the debounce.
    pub fn resolve(&self, text: &str) -> ResultSet {
        self.orchestrator.resolve(text)
    }

    /// Feeds a keystroke to the debouncer. Returns the submit's generation.
    pub fn notify_query_changed(&self, text: &str) -> u64 {
        self.scheduler.submit(text)
    }

    /// Validates, persists and applies a confirmed settings change.
    pub fn apply_settings(&self, config: SearchConfig) -> Result<()> {
        config.validate()?;
        if let Some(path) = &self.settings_path {
            write_settings(path, &config)?;
        }
        self.orchestrator.apply_settings(&config);
        *self.config.write() = config;
        Ok(())
    }

    pub fn remove_stale_path(&self, text: &str, path: &str) -> Result<bool> {
        self.orchestrator.remove_stale_path(text, path)
    }

    pub fn clear_cache(&self) -> Result<usize> {
        let removed = self.orchestrator.clear_cache()?;
        log::info!("cache cleared by user, removed={}", removed);
        Ok(removed)
    }
}
