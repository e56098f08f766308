//! Cache Entry Module
//!
//! Defines the structure for individual memoized results with TTL support.

use std::time::{Duration, Instant};

// == Cached Entry ==
/// One memoized result for one operation invocation under one state.
///
/// The argument list is cloned when the entry is created, so later mutation
/// of the caller's own values cannot corrupt the entry.
#[derive(Debug, Clone)]
pub struct CachedEntry<A, V> {
    /// Arguments the result was produced from
    pub args: A,
    /// The memoized result
    pub value: V,
    /// Absolute expiry instant
    expires_at: Instant,
}

impl<A, V> CachedEntry<A, V> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(args: A, value: V, ttl: Duration) -> Self {
        Self {
            args,
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is considered expired when the current
    /// time is greater than or equal to the expiry instant, so a zero TTL
    /// produces an entry that is expired on the very next check.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    // == Extend ==
    /// Pushes the expiry instant to now + `ttl`.
    ///
    /// Called on every cache hit: reuse prolongs an entry's life, which is
    /// what distinguishes this cache from a plain fixed-TTL one. An already
    /// expired entry is revived the same way.
    pub fn extend(&mut self, ttl: Duration) {
        self.expires_at = Instant::now() + ttl;
    }

    // == Time To Live ==
    /// Returns remaining time until expiry, zero if already expired.
    ///
    /// Useful for debugging and statistics.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = CachedEntry::new(vec![1, 2], 0.5_f64, Duration::from_secs(60));

        assert_eq!(entry.args, vec![1, 2]);
        assert_eq!(entry.value, 0.5);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CachedEntry::new((), "v", Duration::from_millis(50));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(80));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_entry_zero_ttl_is_expired() {
        let entry = CachedEntry::new((), "v", Duration::ZERO);
        assert!(entry.is_expired());
    }

    #[test]
    fn test_extend_prolongs_life() {
        let mut entry = CachedEntry::new((), "v", Duration::from_millis(50));

        sleep(Duration::from_millis(30));
        entry.extend(Duration::from_millis(100));
        sleep(Duration::from_millis(40));

        // Without the extension the original 50ms window would have elapsed
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_extend_revives_expired_entry() {
        let mut entry = CachedEntry::new((), "v", Duration::ZERO);
        assert!(entry.is_expired());

        entry.extend(Duration::from_secs(10));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CachedEntry::new((), "v", Duration::from_secs(10));

        let remaining = entry.ttl_remaining();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining >= Duration::from_secs(9));
    }

    #[test]
    fn test_ttl_remaining_expired() {
        let entry = CachedEntry::new((), "v", Duration::ZERO);
        assert_eq!(entry.ttl_remaining(), Duration::ZERO);
    }
}
