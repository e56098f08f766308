//! State Cache - transparent per-state memoization
//!
//! Wraps a stateful object and memoizes its expensive read operations per
//! observable state, with TTL expiry that is refreshed on every reuse.
//! Mutations transition the active state; returning to a previously seen
//! state brings that state's cached results back for free.

pub mod cache;
pub mod config;
pub mod error;
pub mod proxy;
pub mod registry;
pub mod tasks;

pub use cache::{CacheStats, CacheStore, CachedEntry};
pub use config::Config;
pub use error::CacheError;
pub use proxy::{CacheProxy, CacheTarget};
pub use registry::{OpPolicy, OpRegistry};
pub use tasks::{spawn_sweeper_task, SweepHandle, SweepRegistration, Sweeper};
