//! Cache Store Module
//!
//! Main cache engine: a two-level mapping from state snapshot to operation
//! name to memoized entries, plus the currently active state pointer.
//!
//! Entries live under the state that was active when they were produced.
//! A mutation that moves the object away from a state never deletes that
//! state's entries; they simply stop being reachable until the object
//! returns to a structurally equal state, at which point they are reused.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheStats, CachedEntry, StateLru};

// == Cache Store ==
/// All memoized knowledge for one wrapped object.
///
/// Generic over the state snapshot type `S`, the argument list type `A` and
/// the result type `V`. Owned exclusively by one cache instance; callers are
/// expected to guard it with their own lock.
#[derive(Debug)]
pub struct CacheStore<S, A, V> {
    /// State -> operation name -> entries for distinct argument lists
    entries: HashMap<S, HashMap<String, Vec<CachedEntry<A, V>>>>,
    /// State the wrapped object is currently in
    active: S,
    /// Activation recency of retained state keys
    lru: StateLru<S>,
    /// Performance statistics
    stats: CacheStats,
    /// Cap on retained state keys, None = unbounded
    max_states: Option<usize>,
}

impl<S, A, V> CacheStore<S, A, V>
where
    S: Clone + Eq + Hash,
    A: Clone + PartialEq,
    V: Clone,
{
    // == Constructor ==
    /// Creates a new store with the given initial state.
    ///
    /// # Arguments
    /// * `initial` - State of the wrapped object at construction time
    /// * `max_states` - Optional cap on retained state keys
    pub fn new(initial: S, max_states: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            active: initial,
            lru: StateLru::new(),
            stats: CacheStats::new(),
            max_states,
        }
    }

    // == Active State ==
    /// Returns the currently active state.
    pub fn active(&self) -> &S {
        &self.active
    }

    // == Lookup ==
    /// Looks up a memoized result for `op` called with `args` under the
    /// active state.
    ///
    /// Argument lists are compared by equality, not identity, with a linear
    /// scan over the (typically small) entry set. On a fresh hit the entry's
    /// expiry is pushed to now + `ttl`. An expired entry is reported as a
    /// miss and left in place for `store` to overwrite or `sweep` to remove.
    pub fn lookup(&mut self, op: &str, args: &A, ttl: Duration) -> Option<V> {
        let found = self
            .entries
            .get_mut(&self.active)
            .and_then(|ops| ops.get_mut(op))
            .and_then(|set| set.iter_mut().find(|e| &e.args == args));

        match found {
            Some(entry) if !entry.is_expired() => {
                entry.extend(ttl);
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            _ => None,
        }
    }

    // == Store ==
    /// Stores a result for `op` called with `args` under the active state,
    /// expiring `ttl` from now.
    ///
    /// If an equal-argument entry already exists and is still fresh, a
    /// concurrent writer got there first since this caller's own lookup: the
    /// write is discarded and the existing value returned, so racing callers
    /// converge on one result and no duplicate entry is ever created. An
    /// expired equal-argument entry is overwritten in place.
    pub fn store(&mut self, op: &str, args: A, value: V, ttl: Duration) -> V {
        let active = self.active.clone();
        if !self.entries.contains_key(&active) {
            self.lru.touch(&active);
        }

        let set = self
            .entries
            .entry(active)
            .or_default()
            .entry(op.to_string())
            .or_default();

        let stored = match set.iter_mut().find(|e| e.args == args) {
            Some(existing) if !existing.is_expired() => existing.value.clone(),
            Some(existing) => {
                existing.value = value.clone();
                existing.extend(ttl);
                value
            }
            None => {
                set.push(CachedEntry::new(args, value.clone(), ttl));
                value
            }
        };

        self.enforce_state_cap();
        self.refresh_totals();
        stored
    }

    // == Set Active State ==
    /// Transitions the active state after a successful mutation.
    ///
    /// A state structurally equal to the current one is a no-op. A state
    /// equal to a previously retained key makes that key active again, so
    /// everything memoized under it becomes servable once more. A genuinely
    /// new state is inserted with an empty operation map.
    pub fn set_active_state(&mut self, state: S) {
        if state == self.active {
            return;
        }

        if !self.entries.contains_key(&state) {
            self.entries.insert(state.clone(), HashMap::new());
        }
        self.lru.touch(&state);
        self.active = state;
        self.enforce_state_cap();
        self.refresh_totals();
    }

    // == Expired Ratio ==
    /// Fraction of all entries, across every state and operation, whose
    /// expiry has already passed. Returns 0.0 for an empty store.
    pub fn expired_ratio(&self) -> f64 {
        let mut total = 0usize;
        let mut expired = 0usize;

        for ops in self.entries.values() {
            for set in ops.values() {
                total += set.len();
                expired += set.iter().filter(|e| e.is_expired()).count();
            }
        }

        if total == 0 {
            0.0
        } else {
            expired as f64 / total as f64
        }
    }

    // == Sweep ==
    /// Removes every expired entry, then every emptied operation map, then
    /// every emptied state key.
    ///
    /// Returns the number of entries removed. The active state's key may be
    /// removed too when everything under it has expired; `store` recreates
    /// it on the next miss.
    pub fn sweep(&mut self) -> usize {
        let mut removed = 0usize;

        let lru = &mut self.lru;
        self.entries.retain(|state, ops| {
            ops.retain(|_, set| {
                let before = set.len();
                set.retain(|e| !e.is_expired());
                removed += before - set.len();
                !set.is_empty()
            });
            let keep = !ops.is_empty();
            if !keep {
                lru.remove(state);
            }
            keep
        });

        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        self.stats.record_swept(removed);
        self.refresh_totals();
        removed
    }

    // == Counts ==
    /// Returns the number of memoized entries across all states.
    pub fn entry_count(&self) -> usize {
        self.entries.values().flat_map(|ops| ops.values()).map(Vec::len).sum()
    }

    /// Returns the number of retained state keys.
    pub fn state_count(&self) -> usize {
        self.entries.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_totals(self.entry_count(), self.state_count());
        stats
    }

    /// Mutable access for the dispatch layer's miss/coalesce accounting.
    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    // == Internals ==
    /// Evicts least-recently-active state keys while over the cap.
    ///
    /// The active state is never evicted.
    fn enforce_state_cap(&mut self) {
        let Some(cap) = self.max_states else { return };

        while self.entries.len() > cap.max(1) {
            let Some(victim) = self.lru.evict_oldest() else { break };
            if victim == self.active {
                // Only the active key is left over the cap; nothing to evict
                self.lru.touch(&victim);
                break;
            }
            self.entries.remove(&victim);
            self.stats.record_state_eviction();
            debug!("evicted least-recently-active state over cap");
        }
    }

    fn refresh_totals(&mut self) {
        let entries = self.entry_count();
        let states = self.state_count();
        self.stats.set_totals(entries, states);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const TTL: Duration = Duration::from_millis(300);

    fn store() -> CacheStore<u32, Vec<i64>, f64> {
        CacheStore::new(0, None)
    }

    #[test]
    fn test_store_new() {
        let s = store();
        assert_eq!(s.entry_count(), 0);
        assert_eq!(s.state_count(), 0);
        assert_eq!(*s.active(), 0);
    }

    #[test]
    fn test_store_and_lookup() {
        let mut s = store();

        s.store("value", vec![], 0.2, TTL);
        assert_eq!(s.lookup("value", &vec![], TTL), Some(0.2));
        assert_eq!(s.entry_count(), 1);
    }

    #[test]
    fn test_lookup_miss_on_empty() {
        let mut s = store();
        assert_eq!(s.lookup("value", &vec![], TTL), None);
    }

    #[test]
    fn test_lookup_distinguishes_args() {
        let mut s = store();

        s.store("value", vec![1], 1.0, TTL);
        s.store("value", vec![2], 2.0, TTL);

        assert_eq!(s.lookup("value", &vec![1], TTL), Some(1.0));
        assert_eq!(s.lookup("value", &vec![2], TTL), Some(2.0));
        assert_eq!(s.lookup("value", &vec![3], TTL), None);
        assert_eq!(s.entry_count(), 2);
    }

    #[test]
    fn test_store_discards_duplicate_write() {
        let mut s = store();

        // First writer wins; the second write for equal args is discarded
        let first = s.store("value", vec![1], 1.0, TTL);
        let second = s.store("value", vec![1], 9.0, TTL);

        assert_eq!(first, 1.0);
        assert_eq!(second, 1.0);
        assert_eq!(s.entry_count(), 1);
        assert_eq!(s.lookup("value", &vec![1], TTL), Some(1.0));
    }

    #[test]
    fn test_store_overwrites_expired_entry() {
        let mut s = store();

        s.store("value", vec![1], 1.0, Duration::ZERO);
        assert_eq!(s.lookup("value", &vec![1], TTL), None);

        let stored = s.store("value", vec![1], 2.0, TTL);
        assert_eq!(stored, 2.0);
        assert_eq!(s.entry_count(), 1);
        assert_eq!(s.lookup("value", &vec![1], TTL), Some(2.0));
    }

    #[test]
    fn test_lookup_expired_is_miss() {
        let mut s = store();

        s.store("value", vec![], 0.2, Duration::from_millis(30));
        sleep(Duration::from_millis(50));

        assert_eq!(s.lookup("value", &vec![], TTL), None);
        // The expired entry stays behind for store/sweep to deal with
        assert_eq!(s.entry_count(), 1);
    }

    #[test]
    fn test_lookup_extends_expiry() {
        let mut s = store();

        s.store("value", vec![], 0.2, Duration::from_millis(80));
        sleep(Duration::from_millis(50));

        // Hit inside the window pushes expiry out by the full TTL again
        assert_eq!(
            s.lookup("value", &vec![], Duration::from_millis(80)),
            Some(0.2)
        );
        sleep(Duration::from_millis(50));
        assert_eq!(
            s.lookup("value", &vec![], Duration::from_millis(80)),
            Some(0.2)
        );
    }

    #[test]
    fn test_set_active_state_same_state_noop() {
        let mut s = store();
        s.store("value", vec![], 0.2, TTL);

        s.set_active_state(0);
        assert_eq!(s.lookup("value", &vec![], TTL), Some(0.2));
        assert_eq!(s.state_count(), 1);
    }

    #[test]
    fn test_set_active_state_hides_old_entries() {
        let mut s = store();
        s.store("value", vec![], 0.2, TTL);

        s.set_active_state(1);
        assert_eq!(s.lookup("value", &vec![], TTL), None);
    }

    #[test]
    fn test_revisited_state_restores_entries() {
        let mut s = store();
        s.store("value", vec![], 0.2, TTL);

        s.set_active_state(1);
        s.store("value", vec![], 0.5, TTL);

        s.set_active_state(0);
        assert_eq!(s.lookup("value", &vec![], TTL), Some(0.2));

        s.set_active_state(1);
        assert_eq!(s.lookup("value", &vec![], TTL), Some(0.5));
    }

    #[test]
    fn test_expired_ratio_empty() {
        let s = store();
        assert_eq!(s.expired_ratio(), 0.0);
    }

    #[test]
    fn test_expired_ratio_all_fresh() {
        let mut s = store();
        s.store("value", vec![1], 1.0, TTL);
        s.store("value", vec![2], 2.0, TTL);
        assert_eq!(s.expired_ratio(), 0.0);
    }

    #[test]
    fn test_expired_ratio_all_expired() {
        let mut s = store();
        s.store("value", vec![1], 1.0, Duration::ZERO);
        s.store("value", vec![2], 2.0, Duration::ZERO);
        assert_eq!(s.expired_ratio(), 1.0);
    }

    #[test]
    fn test_expired_ratio_mixed() {
        let mut s = store();
        s.store("value", vec![1], 1.0, Duration::ZERO);
        s.store("value", vec![2], 2.0, TTL);
        assert_eq!(s.expired_ratio(), 0.5);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let mut s = store();
        s.store("old", vec![], 1.0, Duration::ZERO);
        s.store("fresh", vec![], 2.0, TTL);

        let removed = s.sweep();
        assert_eq!(removed, 1);
        assert_eq!(s.entry_count(), 1);
        assert_eq!(s.lookup("fresh", &vec![], TTL), Some(2.0));
    }

    #[test]
    fn test_sweep_drops_emptied_states() {
        let mut s = store();
        s.store("value", vec![], 1.0, Duration::ZERO);
        s.set_active_state(1);
        s.store("value", vec![], 2.0, TTL);

        s.sweep();
        // State 0 had only the expired entry; its key is gone entirely
        assert_eq!(s.state_count(), 1);
        assert_eq!(s.lookup("value", &vec![], TTL), Some(2.0));
    }

    #[test]
    fn test_sweep_empty_store() {
        let mut s = store();
        assert_eq!(s.sweep(), 0);
    }

    #[test]
    fn test_store_recreates_state_after_sweep() {
        let mut s = store();
        s.store("value", vec![], 1.0, Duration::ZERO);
        s.sweep();
        assert_eq!(s.state_count(), 0);

        s.store("value", vec![], 2.0, TTL);
        assert_eq!(s.lookup("value", &vec![], TTL), Some(2.0));
    }

    #[test]
    fn test_state_cap_evicts_least_recently_active() {
        let mut s: CacheStore<u32, Vec<i64>, f64> = CacheStore::new(0, Some(2));

        s.store("value", vec![], 0.0, TTL); // state 0
        s.set_active_state(1);
        s.store("value", vec![], 1.0, TTL);
        s.set_active_state(2);
        s.store("value", vec![], 2.0, TTL);

        // Cap of 2: state 0 was the least recently active, so it is gone
        assert_eq!(s.state_count(), 2);
        s.set_active_state(1);
        assert_eq!(s.lookup("value", &vec![], TTL), Some(1.0));

        // Coming back to the evicted state starts from scratch
        s.set_active_state(0);
        assert_eq!(s.lookup("value", &vec![], TTL), None);

        assert_eq!(s.stats().state_evictions, 2);
    }

    #[test]
    fn test_state_cap_never_evicts_active() {
        let mut s: CacheStore<u32, Vec<i64>, f64> = CacheStore::new(0, Some(1));

        s.store("value", vec![], 0.0, TTL);
        s.set_active_state(1);
        s.store("value", vec![], 1.0, TTL);

        assert_eq!(s.state_count(), 1);
        assert_eq!(s.lookup("value", &vec![], TTL), Some(1.0));
    }

    #[test]
    fn test_stats_track_hits_and_totals() {
        let mut s = store();
        s.store("value", vec![], 0.2, TTL);
        s.lookup("value", &vec![], TTL);
        s.lookup("value", &vec![], TTL);

        let stats = s.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.tracked_states, 1);
    }
}
