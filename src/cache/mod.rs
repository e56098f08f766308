//! Cache Module
//!
//! Per-state memoization storage with TTL expiry that is refreshed on reuse.

mod entry;
mod state_lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CachedEntry;
pub use state_lru::StateLru;
pub use stats::CacheStats;
pub use store::CacheStore;
