//! State Recency Module
//!
//! Tracks how recently each retained state key was active, backing the
//! optional cap on retained states.

use std::collections::VecDeque;

// == State LRU ==
/// Tracks activation order of state keys.
///
/// Keys are stored in a VecDeque where:
/// - Front = Most recently active
/// - Back = Least recently active
#[derive(Debug)]
pub struct StateLru<K> {
    /// Order of state keys by last activation
    order: VecDeque<K>,
}

impl<K: Clone + PartialEq> StateLru<K> {
    // == Constructor ==
    /// Creates a new empty recency tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Touch ==
    /// Marks a state key as just activated (moves to front).
    pub fn touch(&mut self, key: &K) {
        self.remove(key);
        self.order.push_front(key.clone());
    }

    // == Remove ==
    /// Removes a state key from the tracker.
    pub fn remove(&mut self, key: &K) {
        self.order.retain(|k| k != key);
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently active key.
    ///
    /// Returns None if the tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        self.order.pop_back()
    }

    // == Length ==
    /// Returns the number of tracked state keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<K: Clone + PartialEq> Default for StateLru<K> {
    fn default() -> Self {
        Self::new()
    }
}
