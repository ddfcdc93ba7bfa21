//! Limiter policy configuration.

use std::fmt;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::Method;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Default window size: 15 minutes.
const DEFAULT_WINDOW_SECS: u64 = 900;
/// Default request ceiling per window.
const DEFAULT_MAX_REQUESTS: u32 = 100;
/// Default block duration: 1 hour.
const DEFAULT_BLOCK_SECS: u64 = 3600;

/// Immutable configuration for one limiter instance.
///
/// Several named policies coexist in a process, each backed by its own
/// independent window and block state. Misconfiguration (for example a
/// zero `max_requests`) is the operator's responsibility; no runtime
/// guard is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterPolicy {
    /// Window duration in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Maximum requests tolerated within one window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// How long an over-limit key stays blocked, in seconds.
    #[serde(default = "default_block_secs")]
    pub block_secs: u64,

    /// Which requests bypass the limiter without consuming quota.
    #[serde(default)]
    pub skip: SkipRule,

    /// When set, responses with a status below 400 are retroactively
    /// un-counted, so only failed requests consume quota.
    #[serde(default)]
    pub count_success_only: bool,

    /// Human-readable message prefixed to deny responses.
    #[serde(default = "default_message")]
    pub message: String,
}

fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

fn default_max_requests() -> u32 {
    DEFAULT_MAX_REQUESTS
}

fn default_block_secs() -> u64 {
    DEFAULT_BLOCK_SECS
}

fn default_message() -> String {
    "Too many requests from this address.".to_string()
}

impl Default for LimiterPolicy {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
            block_secs: default_block_secs(),
            skip: SkipRule::default(),
            count_success_only: false,
            message: default_message(),
        }
    }
}

impl LimiterPolicy {
    /// Moderate limits suitable as a process-wide default.
    pub fn moderate() -> Self {
        Self::default()
    }

    /// Tight limits for destructive or administrative operations.
    pub fn strict() -> Self {
        Self {
            max_requests: 20,
            block_secs: 7200,
            message: "Too many requests to a restricted operation.".to_string(),
            ..Self::default()
        }
    }

    /// Login limits: only failed attempts consume quota.
    pub fn login() -> Self {
        Self {
            max_requests: 10,
            count_success_only: true,
            message: "Too many failed login attempts.".to_string(),
            ..Self::default()
        }
    }

    /// The window duration.
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs as i64)
    }

    /// The block duration.
    pub fn block_duration(&self) -> Duration {
        Duration::seconds(self.block_secs as i64)
    }

    /// The block duration in whole minutes, rounded up.
    pub fn block_minutes(&self) -> i64 {
        (self.block_secs as i64 + 59) / 60
    }
}

/// Programmatic skip predicate over the whole request.
pub type SkipPredicate = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Which requests bypass a limiter entirely.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipRule {
    /// Exempt CORS pre-flight requests (the `OPTIONS` method).
    #[default]
    Preflight,
    /// Never skip; every request is counted.
    None,
    /// Exempt an explicit list of HTTP methods.
    Methods(Vec<String>),
    /// Arbitrary predicate over the request, for library users; not
    /// expressible in configuration files.
    #[serde(skip)]
    Custom(SkipPredicate),
}

impl SkipRule {
    /// Wrap a closure deciding per request whether to bypass the limiter.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        SkipRule::Custom(Arc::new(predicate))
    }

    /// Whether this request bypasses the limiter.
    pub fn matches(&self, request: &Request) -> bool {
        match self {
            SkipRule::Preflight => request.method() == Method::OPTIONS,
            SkipRule::None => false,
            SkipRule::Methods(methods) => methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case(request.method().as_str())),
            SkipRule::Custom(predicate) => predicate(request),
        }
    }
}

impl fmt::Debug for SkipRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipRule::Preflight => f.write_str("Preflight"),
            SkipRule::None => f.write_str("None"),
            SkipRule::Methods(methods) => f.debug_tuple("Methods").field(methods).finish(),
            SkipRule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for SkipRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SkipRule::Preflight, SkipRule::Preflight) | (SkipRule::None, SkipRule::None) => true,
            (SkipRule::Methods(a), SkipRule::Methods(b)) => a == b,
            // Closures compare by identity.
            (SkipRule::Custom(a), SkipRule::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for SkipRule {}
