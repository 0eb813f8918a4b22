//! Keystroke debouncing.
//!
//! Every submit supersedes the pending timer. Only a timer that sleeps
//! through its whole delay starts a resolve, which then runs on the blocking
//! pool and is never cancelled. Each submit bumps a generation; results are
//! only delivered while their generation is still the newest, so a slow
//! resolve can never overwrite the output of a later query.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{self, JoinHandle};

use crate::cancel::GenerationTracker;
use crate::types::{Query, ResultSet};

/// Quiet period after the last keystroke before a search starts.
pub const QUERY_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Turns query text into results. Called on a blocking thread.
pub trait Resolver: Send + Sync + 'static {
    fn resolve(&self, text: &str) -> ResultSet;
}

/// Output of the scheduler, tagged with the submit that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    /// A blank query was submitted.
    Cleared { generation: u64 },
    Results {
        generation: u64,
        query: String,
        results: ResultSet,
    },
}

impl SearchEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Cleared { generation } | Self::Results { generation, .. } => *generation,
        }
    }
}

pub struct QueryScheduler {
    resolver: Arc<dyn Resolver>,
    delay: Duration,
    generations: GenerationTracker,
    pending: Mutex<Option<JoinHandle<()>>>,
    events: UnboundedSender<SearchEvent>,
    runtime: Handle,
}

impl std::fmt::Debug for QueryScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryScheduler")
            .field("delay", &self.delay)
            .field("generation", &self.generations.current())
            .finish()
    }
}

impl QueryScheduler {
    /// Creates a scheduler bound to the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(
        resolver: Arc<dyn Resolver>,
        delay: Duration,
    ) -> (Self, UnboundedReceiver<SearchEvent>) {
        Self::with_runtime(resolver, delay, Handle::current())
    }

    /// Creates a scheduler that spawns its timers on `runtime`, so `submit`
    /// may be called from threads outside the runtime.
    pub fn with_runtime(
        resolver: Arc<dyn Resolver>,
        delay: Duration,
        runtime: Handle,
    ) -> (Self, UnboundedReceiver<SearchEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            resolver,
            delay,
            generations: GenerationTracker::new(),
            pending: Mutex::new(None),
            events,
            runtime,
        };
        (scheduler, receiver)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Generation of the most recent submit.
    pub fn current_generation(&self) -> u64 {
        self.generations.current()
    }

    /// Records `text` as the latest query and restarts the debounce timer.
    ///
    /// Blank text cancels the pending timer and emits
    /// [`SearchEvent::Cleared`] immediately. Returns the submit's generation.
    pub fn submit(&self, text: &str) -> u64 {
        let mut pending = self.pending.lock();
        let generation = self.generations.next_generation();

        if let Some(timer) = pending.take() {
            if !timer.is_finished() {
                log::debug!("debounce superseded by generation={}", generation);
            }
            timer.abort();
        }

        if Query::new(text).is_blank() {
            let _ = self.events.send(SearchEvent::Cleared { generation });
            return generation;
        }

        let resolver = Arc::clone(&self.resolver);
        let generations = self.generations.clone();
        let events = self.events.clone();
        let delay = self.delay;
        let query = text.to_string();

        *pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !generations.is_current(generation) {
                return;
            }
            // Detached so that aborting this timer never cancels a started resolve.
            tokio::spawn(run_resolve(resolver, generations, events, generation, query));
        }));
        generation
    }
}

impl Drop for QueryScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.get_mut().take() {
            timer.abort();
        }
    }
}

async fn run_resolve(
    resolver: Arc<dyn Resolver>,
    generations: GenerationTracker,
    events: UnboundedSender<SearchEvent>,
    generation: u64,
    query: String,
) {
    let text = query.clone();
    let results = match task::spawn_blocking(move || resolver.resolve(&text)).await {
        Ok(results) => results,
        Err(error) => {
            log::warn!("resolve task failed generation={}: {}", generation, error);
            return;
        }
    };

    if !generations.is_current(generation) {
        log::debug!(
            "dropping stale results generation={} current={}",
            generation,
            generations.current()
        );
        return;
    }
    let _ = events.send(SearchEvent::Results {
        generation,
        query,
        results,
    });
}
