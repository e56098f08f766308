//! Interception / Dispatch Layer
//!
//! Wraps a stateful object and routes every operation call to the cache
//! lookup path, the invoke-and-populate path, or the state-transition path,
//! according to the operation registry.
//!
//! # Locking
//! Two domains, acquired in a fixed order (target lock first, store lock
//! second, never the reverse):
//! - The target sits in a `tokio::sync::RwLock`. Cacheable and passthrough
//!   calls take a read guard and hold it across lookup, invocation and
//!   store, so a result is always recorded against the state that was active
//!   when the real operation ran. Mutators take the write guard across
//!   mutate-and-transition, which also blocks until every in-flight
//!   cacheable call has finished storing.
//! - The store and the in-flight table sit behind one `std::sync::Mutex`
//!   held only for map work, never across an await or a target invocation.

use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tracing::{debug, trace};

use crate::cache::{CacheStats, CacheStore};
use crate::registry::{OpPolicy, OpRegistry};
use crate::tasks::SweepHandle;

// == Cache Target ==
/// Capability surface a wrapped object must expose to be cached.
///
/// The object itself produces its state snapshot: anything with structural
/// equality and a content-derived hash works as a state value. Read-style
/// operations go through `query` and cannot touch state (`&self` makes the
/// mid-mutation consistency guarantee structural); mutating operations go
/// through `mutate` and must be registered as mutators.
pub trait CacheTarget {
    /// Structural snapshot of all fields that cacheable results depend on
    type State: Clone + Eq + Hash + Send + Sync + 'static;
    /// Argument list, compared by equality when matching cache entries
    type Args: Clone + PartialEq + Send + Sync + 'static;
    /// Operation result
    type Output: Clone + Send + Sync + 'static;
    /// The object's own failure type, propagated unchanged by the proxy
    type Error: Send + 'static;

    /// Captures the current observable state. Pure and side-effect free.
    fn snapshot(&self) -> Self::State;

    /// Invokes a read-style operation.
    fn query(&self, op: &str, args: &Self::Args) -> Result<Self::Output, Self::Error>;

    /// Invokes a state-changing operation.
    fn mutate(&mut self, op: &str, args: &Self::Args) -> Result<Self::Output, Self::Error>;
}

// == In-Flight Table ==
/// One cacheable miss currently being computed.
///
/// Later callers for the same (state, op, args) key wait on `notify` instead
/// of invoking the real operation again.
struct Flight<S, A> {
    state: S,
    op: String,
    args: A,
    notify: Arc<Notify>,
}

/// Store plus in-flight table, guarded together by the store-mutation lock.
struct Inner<T: CacheTarget> {
    store: CacheStore<T::State, T::Args, T::Output>,
    flights: Vec<Flight<T::State, T::Args>>,
}

// == Cache Proxy ==
/// Transparent caching front for one wrapped object.
///
/// Safe to share behind an `Arc` across tasks; all synchronization is
/// internal.
pub struct CacheProxy<T: CacheTarget> {
    target: RwLock<T>,
    inner: Mutex<Inner<T>>,
    registry: OpRegistry,
}

impl<T: CacheTarget> CacheProxy<T> {
    // == Constructors ==
    /// Wraps `target`, capturing its initial state. Retained states are
    /// unbounded, matching the revisit-restores-cache behavior.
    pub fn new(target: T, registry: OpRegistry) -> Self {
        Self::with_max_states(target, registry, None)
    }

    /// Like [`CacheProxy::new`] but caps the number of retained state keys;
    /// the least-recently-active state is dropped when the cap is exceeded.
    pub fn with_max_states(target: T, registry: OpRegistry, max_states: Option<usize>) -> Self {
        let initial = target.snapshot();
        Self {
            target: RwLock::new(target),
            inner: Mutex::new(Inner {
                store: CacheStore::new(initial, max_states),
                flights: Vec::new(),
            }),
            registry,
        }
    }

    // == Call ==
    /// Invokes an operation on the wrapped object through the cache.
    ///
    /// The operation's registered policy decides the path; operations the
    /// registry does not know are forwarded unchanged.
    pub async fn call(&self, op: &str, args: T::Args) -> Result<T::Output, T::Error> {
        match self.registry.policy(op) {
            OpPolicy::Cacheable { ttl } => self.call_cacheable(op, args, ttl).await,
            OpPolicy::Mutator => self.call_mutator(op, args).await,
            OpPolicy::Passthrough => {
                trace!(op, "passthrough call");
                let target = self.target.read().await;
                target.query(op, &args)
            }
        }
    }

    // == Cacheable Path ==
    /// Lookup under the active state; on miss invoke the real operation once
    /// and store its result.
    ///
    /// Concurrent misses for the same (state, op, args) key are coalesced:
    /// the first claimant invokes, the rest wait and then re-run the lookup.
    /// The shared target guard is held for the whole span, so no mutator can
    /// slip a state change between the invocation and the store.
    async fn call_cacheable(
        &self,
        op: &str,
        args: T::Args,
        ttl: Duration,
    ) -> Result<T::Output, T::Error> {
        let target = self.target.read().await;

        loop {
            let notify: Arc<Notify>;
            let state: T::State;
            let mut wakeup = None;

            // The store guard lives only in this block, so it is released
            // unconditionally before any await and the call future stays
            // spawnable.
            {
                let mut inner = self.inner();

                if let Some(value) = inner.store.lookup(op, &args, ttl) {
                    trace!(op, "cache hit");
                    return Ok(value);
                }

                state = inner.store.active().clone();
                let in_flight = inner
                    .flights
                    .iter()
                    .find(|f| f.state == state && f.op == op && f.args == args)
                    .map(|f| f.notify.clone());

                match in_flight {
                    Some(existing) => {
                        // Enable the wakeup before releasing the store lock,
                        // otherwise the leader could notify in between.
                        inner.store.stats_mut().record_coalesced();
                        notify = existing;
                        let mut pending = Box::pin(notify.notified());
                        pending.as_mut().enable();
                        wakeup = Some(pending);
                    }
                    None => {
                        notify = Arc::new(Notify::new());
                        inner.flights.push(Flight {
                            state: state.clone(),
                            op: op.to_string(),
                            args: args.clone(),
                            notify: notify.clone(),
                        });
                        inner.store.stats_mut().record_miss();
                    }
                }
            }

            if let Some(wakeup) = wakeup {
                trace!(op, "awaiting in-flight computation");
                wakeup.await;
                // Re-run the lookup; on leader failure one waiter becomes
                // the next leader.
                continue;
            }

            debug!(op, "cache miss, invoking real operation");
            let result = target.query(op, &args);

            let mut inner = self.inner();
            inner
                .flights
                .retain(|f| !(f.state == state && f.op == op && f.args == args));
            notify.notify_waiters();

            return match result {
                Ok(value) => Ok(inner.store.store(op, args, value, ttl)),
                Err(err) => Err(err),
            };
        }
    }

    // == Mutator Path ==
    /// Runs the mutation and transitions the active state, atomically with
    /// respect to every cacheable call.
    async fn call_mutator(&self, op: &str, args: T::Args) -> Result<T::Output, T::Error> {
        let mut target = self.target.write().await;

        // A failed mutation must not advance the active state
        let output = target.mutate(op, &args)?;

        let snapshot = target.snapshot();
        self.inner().store.set_active_state(snapshot);
        debug!(op, "mutation applied, active state transitioned");

        Ok(output)
    }

    // == Maintenance Surface ==
    /// Fraction of memoized entries past their expiry, at this instant.
    pub fn expired_ratio(&self) -> f64 {
        self.inner().store.expired_ratio()
    }

    /// Removes every expired entry; returns the number removed.
    pub fn sweep(&self) -> usize {
        self.inner().store.sweep()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner().store.stats()
    }

    /// Returns the number of memoized entries across all states.
    pub fn entry_count(&self) -> usize {
        self.inner().store.entry_count()
    }

    /// Returns the number of retained state keys.
    pub fn state_count(&self) -> usize {
        self.inner().store.state_count()
    }

    /// Acquires the store-mutation lock, recovering from poisoning: the
    /// store's own invariants hold after every individual map operation.
    fn inner(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// == Sweep Handle ==
impl<T> SweepHandle for CacheProxy<T>
where
    T: CacheTarget + Send + Sync,
{
    fn expired_ratio(&self) -> f64 {
        CacheProxy::expired_ratio(self)
    }

    fn sweep(&self) -> usize {
        CacheProxy::sweep(self)
    }
}
