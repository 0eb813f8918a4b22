//! Query resolution and keystroke scheduling.
//!
//! - `orchestrator` - Cache-first resolve with live-walk fallback
//! - `scheduler` - Debounced, generation-tagged dispatch of resolves
//! - `service` - The entry points used by a presentation layer

mod orchestrator;
mod scheduler;
mod service;


// Re-export main types
pub use orchestrator::{Resolution, ResultOrigin, SearchOrchestrator, SearchTunables};
pub use scheduler::{QueryScheduler, Resolver, SearchEvent, QUERY_DEBOUNCE_DELAY};
pub use service::SearchService;
