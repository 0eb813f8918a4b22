//! Generation tracking for superseded queries.
//!
//! Every submitted query bumps the active generation. Work started for an
//! older generation is allowed to finish, but its output is discarded once
//! a newer generation exists, so results never arrive out of submission order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tracks the active query generation.
///
/// Cloning shares the underlying counter.
#[derive(Debug, Clone, Default)]
pub struct GenerationTracker {
    active: Arc<AtomicU64>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the active generation and returns it.
    ///
    /// Every generation handed out before this call becomes stale.
    pub fn next_generation(&self) -> u64 {
        self.active.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the current active generation without incrementing.
    pub fn current(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns true if `generation` is still the newest one handed out.
    #[inline]
    pub fn is_current(&self, generation: u64) -> bool {
        self.active.load(Ordering::SeqCst) == generation
    }
}
