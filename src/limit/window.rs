//! Per-key request window accounting.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Accounting state for one client key.
#[derive(Debug, Clone)]
struct WindowEntry {
    /// Requests seen in the current window.
    count: u32,
    /// When the current window began.
    window_start: DateTime<Utc>,
    /// Copied from the owning store at creation; fixed for the entry's life.
    window_size: Duration,
}

impl WindowEntry {
    /// A window is stale once strictly more than its size has elapsed.
    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.window_start > self.window_size
    }

    fn reset_at(&self) -> DateTime<Utc> {
        self.window_start + self.window_size
    }
}

/// Result of a window check: the count after the increment and the
/// wall-clock time the window next resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSample {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Per-key window counters for a single limiter instance.
///
/// A single mutex guards the map, so each read-modify-write is a
/// serializable unit: concurrent requests for one key land in some
/// serial order with no lost updates.
pub struct WindowStore {
    window_size: Duration,
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl WindowStore {
    /// Create an empty store whose entries use the given window size.
    pub fn new(window_size: Duration) -> Self {
        Self {
            window_size,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Account for one request from `key`.
    ///
    /// Creates the entry lazily with a count of 1, resets it first when
    /// the window has gone stale, and increments otherwise.
    pub fn check_and_increment(&self, key: &str, now: DateTime<Utc>) -> WindowSample {
        let mut entries = self.entries.lock();

        let entry = entries.entry(key.to_string()).or_insert_with(|| WindowEntry {
            count: 0,
            window_start: now,
            window_size: self.window_size,
        });

        if entry.is_stale(now) {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;

        WindowSample {
            count: entry.count,
            reset_at: entry.reset_at(),
        }
    }

    /// Best-effort un-count for `key`, floored at 0.
    ///
    /// Used by the success-skip feature; a missing entry is a no-op.
    pub fn decrement(&self, key: &str) {
        if let Some(entry) = self.entries.lock().get_mut(key) {
            entry.count = entry.count.saturating_sub(1);
        }
    }

    /// Drop the entry for `key`, if any.
    pub fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    /// Evict every stale entry. Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(now));
        before - entries.len()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Snapshot of `(key, count)` pairs for reporting.
    ///
    /// Entries whose window has gone stale at `now` are omitted: between
    /// sweeps they still sit in the map, but their counts belong to an
    /// elapsed window and would misreport.
    pub fn live_counts(&self, now: DateTime<Utc>) -> Vec<(String, u32)> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| !entry.is_stale(now))
            .map(|(key, entry)| (key.clone(), entry.count))
            .collect()
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
    fn test_first_request_creates_entry() {
        let store = WindowStore::new(Duration::seconds(60));
        let sample = store.check_and_increment("k", base());

        assert_eq!(sample.count, 1);
        assert_eq!(sample.reset_at, base() + Duration::seconds(60));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_increments_within_window() {
        let store = WindowStore::new(Duration::seconds(60));
        store.check_and_increment("k", base());
        store.check_and_increment("k", base() + Duration::seconds(10));
        let sample = store.check_and_increment("k", base() + Duration::seconds(59));

        assert_eq!(sample.count, 3);
        assert_eq!(sample.reset_at, base() + Duration::seconds(60));
    }

    #[test]
    fn test_boundary_instant_still_counts() {
        // Staleness is strict: elapsed == window size is not yet stale.
        let store = WindowStore::new(Duration::seconds(60));
        store.check_and_increment("k", base());
        let sample = store.check_and_increment("k", base() + Duration::seconds(60));
        assert_eq!(sample.count, 2);
    }

    #[test]
    fn test_stale_window_resets() {
        let store = WindowStore::new(Duration::seconds(60));
        store.check_and_increment("k", base());
        store.check_and_increment("k", base());

        let now = base() + Duration::seconds(60) + Duration::milliseconds(1);
        let sample = store.check_and_increment("k", now);

        assert_eq!(sample.count, 1);
        assert_eq!(sample.reset_at, now + Duration::seconds(60));
    }

    #[test]
    fn test_keys_are_independent() {
        let store = WindowStore::new(Duration::seconds(60));
        store.check_and_increment("a", base());
        store.check_and_increment("a", base());
        let sample = store.check_and_increment("b", base());

        assert_eq!(sample.count, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_decrement_floors_at_zero() {
        let store = WindowStore::new(Duration::seconds(60));
        store.check_and_increment("k", base());
        store.decrement("k");
        store.decrement("k");

        let sample = store.check_and_increment("k", base());
        assert_eq!(sample.count, 1);
    }

    #[test]
    fn test_decrement_missing_key_is_noop() {
        let store = WindowStore::new(Duration::seconds(60));
        store.decrement("missing");
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_stale_entries() {
        let store = WindowStore::new(Duration::seconds(60));
        store.check_and_increment("old", base());
        store.check_and_increment("fresh", base() + Duration::seconds(90));

        let now = base() + Duration::seconds(100);
        let removed = store.sweep(now);

        assert_eq!(removed, 1);
        assert_eq!(store.live_counts(now), vec![("fresh".to_string(), 1)]);
    }

    #[test]
    fn test_live_counts_skip_stale_entries_before_sweep() {
        let store = WindowStore::new(Duration::seconds(60));
        store.check_and_increment("old", base());
        store.check_and_increment("fresh", base() + Duration::seconds(90));

        // No sweep has run; the stale entry is still in the map but is
        // not reported.
        let now = base() + Duration::seconds(100);
        assert_eq!(store.len(), 2);
        assert_eq!(store.live_counts(now), vec![("fresh".to_string(), 1)]);
    }

    #[test]
    fn test_remove() {
        let store = WindowStore::new(Duration::seconds(60));
        store.check_and_increment("k", base());
        store.remove("k");
        assert!(store.is_empty());
    }
}
