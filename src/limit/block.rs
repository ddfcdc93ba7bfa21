//! Per-key timed deny state.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Keys currently denied service, independent of their window counters.
///
/// A present, unexpired entry takes precedence over any window state.
pub struct BlockRegistry {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The instant the block on `key` lifts, if one is in force.
    ///
    /// An entry that has already expired is removed as a side effect of
    /// this check (lazy eviction).
    pub fn blocked_until(&self, key: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(&until) if now < until => Some(until),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Whether `key` is currently blocked. Evicts an expired entry.
    pub fn is_blocked(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.blocked_until(key, now).is_some()
    }

    /// Read-only probe used by reporting; never evicts.
    pub fn is_blocked_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|&until| now < until)
    }

    /// Block `key` for `duration` from `now`, overwriting any prior block.
    pub fn block(&self, key: &str, now: DateTime<Utc>, duration: Duration) {
        self.entries.lock().insert(key.to_string(), now + duration);
    }

    /// Evict every expired entry. Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, &mut until| now < until);
        before - entries.len()
    }

    /// Number of unexpired blocks, without evicting anything.
    pub fn active(&self, now: DateTime<Utc>) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|&&until| now < until)
            .count()
    }

    /// Number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_key_not_blocked() {
        let registry = BlockRegistry::new();
        assert!(!registry.is_blocked("k", base()));
    }

    #[test]
    fn test_block_and_check() {
        let registry = BlockRegistry::new();
        registry.block("k", base(), Duration::minutes(5));

        assert!(registry.is_blocked("k", base() + Duration::minutes(4)));
        assert_eq!(
            registry.blocked_until("k", base()),
            Some(base() + Duration::minutes(5))
        );
    }

    #[test]
    fn test_expired_block_lazily_evicted() {
        let registry = BlockRegistry::new();
        registry.block("k", base(), Duration::minutes(5));

        assert!(!registry.is_blocked("k", base() + Duration::minutes(5)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_block_overwrites() {
        let registry = BlockRegistry::new();
        registry.block("k", base(), Duration::minutes(5));
        registry.block("k", base() + Duration::minutes(1), Duration::minutes(5));

        assert_eq!(
            registry.blocked_until("k", base() + Duration::minutes(2)),
            Some(base() + Duration::minutes(6))
        );
    }

    #[test]
    fn test_sweep_removes_expired() {
        let registry = BlockRegistry::new();
        registry.block("old", base(), Duration::minutes(1));
        registry.block("fresh", base(), Duration::minutes(30));

        let removed = registry.sweep(base() + Duration::minutes(10));

        assert_eq!(removed, 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_blocked_at("fresh", base() + Duration::minutes(10)));
    }

    #[test]
    fn test_active_and_peek_do_not_evict() {
        let registry = BlockRegistry::new();
        registry.block("expired", base(), Duration::minutes(1));
        registry.block("live", base(), Duration::minutes(30));

        let now = base() + Duration::minutes(10);
        assert_eq!(registry.active(now), 1);
        assert!(!registry.is_blocked_at("expired", now));
        assert_eq!(registry.len(), 2);
    }
}
