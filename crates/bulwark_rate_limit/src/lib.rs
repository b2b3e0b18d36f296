//! Throttling and concurrency limiting.
//!
//! This crate holds the shared, process-wide state of a Bulwark engine:
//!
//! - [`RateTracker`] records when each URL was dispatched
//! - [`ThrottleEngine`] delays dispatches until every matching rule has headroom
//! - [`ConcurrencyLimiter`] caps in-flight calls per group and hands out
//!   [`ConcurrencyGuard`]s that release on drop
//!
//! All waiting uses `tokio::time`, so tests can run on a paused clock.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod concurrency;
mod retry_after;
mod throttle;
mod tracker;

pub use concurrency::{ConcurrencyGuard, ConcurrencyLimiter, DEFAULT_POLL_INTERVAL};
pub use retry_after::parse_retry_after;
pub use throttle::{ThrottleEngine, ThrottleOutcome};
pub use tracker::RateTracker;
