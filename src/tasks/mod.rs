//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the caches.
//!
//! # Tasks
//! - Sweeper: reclaims expired cache entries when a cache's expired-entry
//!   ratio crosses the configured threshold

mod sweeper;

pub use sweeper::{spawn_sweeper_task, SweepHandle, SweepRegistration, Sweeper};
