//! Core rate limiter implementation.

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use super::block::BlockRegistry;
use super::policy::LimiterPolicy;
use super::stats::{LimiterStats, TopRequester, TOP_REQUESTERS};
use super::window::WindowStore;

/// Outcome of a rate limit check for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed(Allowance),
    Denied(Denial),
}

/// An allowed request, with the quota metadata to surface as headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allowance {
    /// The configured ceiling.
    pub limit: u32,
    /// Quota left in the window, floored at 0.
    pub remaining: u32,
    /// When the window next resets.
    pub reset_at: DateTime<Utc>,
}

/// A denied request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    /// Human-readable explanation for the response body.
    pub message: String,
    /// Whole minutes until the caller may retry, rounded up.
    pub retry_after_mins: i64,
}

/// One limiter instance: a policy with its own window and block state.
///
/// Instances are fully independent; a key blocked under one limiter is
/// unaffected under another. This struct is thread-safe and is shared
/// across requests behind an `Arc`.
pub struct RateLimiter {
    name: String,
    policy: LimiterPolicy,
    windows: WindowStore,
    blocks: BlockRegistry,
}

impl RateLimiter {
    /// Create a limiter owning fresh state for the given policy.
    pub fn new(name: impl Into<String>, policy: LimiterPolicy) -> Self {
        let windows = WindowStore::new(policy.window());
        Self {
            name: name.into(),
            policy,
            windows,
            blocks: BlockRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &LimiterPolicy {
        &self.policy
    }

    /// Decide whether the request identified by `key` may proceed.
    ///
    /// A blocked key is denied before any window accounting. Otherwise
    /// the window counter advances; the request that pushes the count
    /// past the ceiling escalates the key to a timed block and is itself
    /// denied. Every path yields a definite decision.
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> Decision {
        trace!(limiter = %self.name, key = %key, "Checking rate limit");

        if let Some(until) = self.blocks.blocked_until(key, now) {
            let minutes = minutes_until(until, now);
            debug!(
                limiter = %self.name,
                key = %key,
                minutes_left = minutes,
                "Request denied, key is blocked"
            );
            return Decision::Denied(Denial {
                message: format!(
                    "{} You are blocked for {} more minute(s).",
                    self.policy.message, minutes
                ),
                retry_after_mins: minutes,
            });
        }

        let sample = self.windows.check_and_increment(key, now);

        if sample.count > self.policy.max_requests {
            self.blocks.block(key, now, self.policy.block_duration());
            // The block takes over accounting for this key; counting
            // restarts from scratch once the block lifts.
            self.windows.remove(key);

            let minutes = self.policy.block_minutes();
            warn!(
                limiter = %self.name,
                key = %key,
                limit = self.policy.max_requests,
                block_minutes = minutes,
                "Request limit exceeded, blocking key"
            );
            return Decision::Denied(Denial {
                message: format!(
                    "{} Limit of {} requests exceeded; blocked for {} minute(s).",
                    self.policy.message, self.policy.max_requests, minutes
                ),
                retry_after_mins: minutes,
            });
        }

        if sample.count as u64 * 5 > self.policy.max_requests as u64 * 4 {
            warn!(
                limiter = %self.name,
                key = %key,
                count = sample.count,
                limit = self.policy.max_requests,
                "Key is above 80% of its request limit"
            );
        }

        Decision::Allowed(Allowance {
            limit: self.policy.max_requests,
            remaining: self.policy.max_requests.saturating_sub(sample.count),
            reset_at: sample.reset_at,
        })
    }

    /// Retroactively un-count one request from `key`.
    ///
    /// Best effort, floored at 0; used when `count_success_only` is set
    /// and the response turned out successful.
    pub fn decrement(&self, key: &str) {
        self.windows.decrement(key);
    }

    /// Evict stale windows and expired blocks.
    ///
    /// Advisory cleanup only; `check` performs its own lazy eviction.
    /// Returns `(windows_removed, blocks_removed)`.
    pub fn sweep(&self, now: DateTime<Utc>) -> (usize, usize) {
        (self.windows.sweep(now), self.blocks.sweep(now))
    }

    /// Read-only snapshot for operational visibility. Mutates nothing.
    ///
    /// Only windows still live at `now` are reported; entries awaiting
    /// the next sweep carry counts from an elapsed window.
    pub fn stats(&self, now: DateTime<Utc>) -> LimiterStats {
        let mut counts = self.windows.live_counts(now);
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let tracked_keys = counts.len();
        counts.truncate(TOP_REQUESTERS);

        let top_requesters = counts
            .into_iter()
            .map(|(key, count)| {
                let blocked = self.blocks.is_blocked_at(&key, now);
                TopRequester { key, count, blocked }
            })
            .collect();

        LimiterStats {
            tracked_keys,
            blocked_keys: self.blocks.active(now),
            top_requesters,
        }
    }
}

/// Whole minutes from `now` until `until`, rounded up.
fn minutes_until(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (until - now).num_milliseconds().max(0);
    (millis + 59_999) / 60_000
}
