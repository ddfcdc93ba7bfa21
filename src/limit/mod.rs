//! Rate limiting engine and state management.

mod block;
mod key;
mod limiter;
mod policy;
mod reaper;
mod registry;
mod stats;
mod window;

pub use block::BlockRegistry;
pub use key::{resolve_client_key, FORWARDED_FOR};
pub use limiter::{Allowance, Decision, Denial, RateLimiter};
pub use policy::{LimiterPolicy, SkipPredicate, SkipRule};
pub use reaper::{Reaper, DEFAULT_SWEEP_INTERVAL};
pub use registry::Limiters;
pub use stats::{LimiterStats, TopRequester, TOP_REQUESTERS};
pub use window::{WindowSample, WindowStore};
