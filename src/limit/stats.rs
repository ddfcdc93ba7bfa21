//! Operational snapshot of limiter state.

use serde::Serialize;

/// How many keys the snapshot reports at most.
pub const TOP_REQUESTERS: usize = 10;

/// One key in the top-requesters list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopRequester {
    pub key: String,
    /// Requests counted in the key's current window.
    pub count: u32,
    /// Whether the key is currently blocked.
    pub blocked: bool,
}

/// Read-only snapshot of one limiter's state.
#[derive(Debug, Clone, Serialize)]
pub struct LimiterStats {
    /// Distinct keys with a live window entry.
    pub tracked_keys: usize,
    /// Keys currently blocked.
    pub blocked_keys: usize,
    /// The busiest keys by in-window count, at most [`TOP_REQUESTERS`].
    pub top_requesters: Vec<TopRequester>,
}
