//! Named limiter instances.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::limiter::RateLimiter;
use super::policy::LimiterPolicy;
use super::stats::LimiterStats;

/// The named limiters of one process, each with independent state.
pub struct Limiters {
    limiters: BTreeMap<String, Arc<RateLimiter>>,
}

impl Limiters {
    /// Build one limiter per named policy.
    pub fn new(policies: impl IntoIterator<Item = (String, LimiterPolicy)>) -> Self {
        let limiters = policies
            .into_iter()
            .map(|(name, policy)| {
                let limiter = Arc::new(RateLimiter::new(name.clone(), policy));
                (name, limiter)
            })
            .collect();
        Self { limiters }
    }

    /// Look up a limiter by name.
    pub fn get(&self, name: &str) -> Option<Arc<RateLimiter>> {
        self.limiters.get(name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<RateLimiter>)> {
        self.limiters.iter().map(|(name, l)| (name.as_str(), l))
    }

    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Snapshot every limiter, keyed by name.
    pub fn stats(&self, now: DateTime<Utc>) -> BTreeMap<String, LimiterStats> {
        self.limiters
            .iter()
            .map(|(name, limiter)| (name.clone(), limiter.stats(now)))
            .collect()
    }
}
