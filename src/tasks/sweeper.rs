//! Cache Sweeper
//!
//! Background task that periodically reclaims expired entries across a
//! dynamic set of cache instances.
//!
//! A cache is only swept when its expired-entry ratio exceeds the configured
//! threshold. Caches whose entries are actively reused keep extending their
//! TTLs and never cross the threshold, so sweeper overhead tracks actual
//! staleness rather than wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;

// == Sweep Handle ==
/// The maintenance surface a cache instance exposes to the sweeper.
pub trait SweepHandle: Send + Sync {
    /// Fraction of entries past their expiry, 0 to 1.
    fn expired_ratio(&self) -> f64;

    /// Removes expired entries; returns the number removed.
    fn sweep(&self) -> usize;
}

/// Registration token returned by [`Sweeper::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepRegistration(u64);

// == Sweeper ==
/// Thread-safe registry of cache handles with threshold-gated sweeping.
///
/// Handles are held weakly: a cache dropped by its owner is skipped silently
/// and pruned on the next cycle, so deregistration is optional.
pub struct Sweeper {
    /// Expired-entry ratio above which a cache is swept
    expire_threshold: f64,
    /// Registered cache handles
    handles: Mutex<Vec<(u64, Weak<dyn SweepHandle>)>>,
    next_id: AtomicU64,
}

impl Sweeper {
    // == Constructors ==
    /// Creates a sweeper with the given expire threshold.
    pub fn new(expire_threshold: f64) -> Self {
        Self {
            expire_threshold,
            handles: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Creates a sweeper from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.expire_threshold)
    }

    // == Register ==
    /// Adds a cache instance to the managed set.
    pub fn register<H: SweepHandle + 'static>(&self, handle: &Arc<H>) -> SweepRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let weak = Arc::downgrade(handle) as Weak<dyn SweepHandle>;
        self.handles_mut().push((id, weak));
        SweepRegistration(id)
    }

    // == Deregister ==
    /// Removes a cache instance from the managed set. Unknown registrations
    /// are ignored.
    pub fn deregister(&self, registration: SweepRegistration) {
        self.handles_mut().retain(|(id, _)| *id != registration.0);
    }

    /// Returns the number of registered handles, dead ones included until
    /// the next cycle prunes them.
    pub fn len(&self) -> usize {
        self.handles_mut().len()
    }

    /// Returns true if no handles are registered.
    pub fn is_empty(&self) -> bool {
        self.handles_mut().is_empty()
    }

    // == Run Once ==
    /// Runs one sweep cycle over every registered cache.
    ///
    /// Caches below the threshold are left alone; dropped caches are pruned.
    /// Returns the total number of entries removed.
    pub fn run_once(&self) -> usize {
        let handles: Vec<(u64, Weak<dyn SweepHandle>)> = {
            let mut guard = self.handles_mut();
            guard.retain(|(_, weak)| weak.strong_count() > 0);
            guard.clone()
        };

        let mut removed = 0usize;
        for (id, weak) in handles {
            // The owner may drop the cache mid-cycle; skip and move on
            let Some(cache) = weak.upgrade() else { continue };

            let ratio = cache.expired_ratio();
            if ratio > self.expire_threshold {
                let swept = cache.sweep();
                removed += swept;
                info!(cache = id, ratio, swept, "sweep triggered");
            } else {
                debug!(cache = id, ratio, "sweep skipped, below threshold");
            }
        }
        removed
    }

    fn handles_mut(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Weak<dyn SweepHandle>)>> {
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// == Sweeper Task ==
/// Spawns a background task running sweep cycles at a fixed interval.
///
/// Returns the task's JoinHandle; aborting it is the stop signal, safe at
/// any point between cycles.
pub fn spawn_sweeper_task(sweeper: Arc<Sweeper>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting sweeper task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = sweeper.run_once();
            if removed > 0 {
                info!(removed, "sweep cycle removed expired entries");
            } else {
                debug!("sweep cycle found nothing to remove");
            }
        }
    })
}
