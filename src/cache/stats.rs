//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses and sweep activity.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of cacheable calls served from the cache
    pub hits: u64,
    /// Number of cacheable calls that invoked the real operation
    pub misses: u64,
    /// Number of cacheable calls coalesced onto another caller's invocation
    pub coalesced: u64,
    /// Number of state keys evicted by the retained-state cap
    pub state_evictions: u64,
    /// Number of entries removed by sweeping
    pub swept: u64,
    /// Current number of memoized entries across all states
    pub total_entries: usize,
    /// Current number of retained state keys
    pub tracked_states: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no cacheable calls have been
    /// made. Coalesced calls count as neither.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Coalesced ==
    /// Increments the coalesced-call counter.
    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    // == Record State Eviction ==
    /// Increments the state-eviction counter.
    pub fn record_state_eviction(&mut self) {
        self.state_evictions += 1;
    }

    // == Record Sweep ==
    /// Adds to the swept-entry counter.
    pub fn record_swept(&mut self, removed: usize) {
        self.swept += removed as u64;
    }

    // == Update Counts ==
    /// Updates the live entry and state counts.
    pub fn set_totals(&mut self, entries: usize, states: usize) {
        self.total_entries = entries;
        self.tracked_states = states;
    }
}
