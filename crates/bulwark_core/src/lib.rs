//! Core data types for the Bulwark HTTP resilience engine.
//!
//! This crate holds the plain data shared by every other Bulwark crate:
//! requests and responses, per-call context, and the rule types that
//! configure throttling, concurrency, retries and replay.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod concurrency;
mod context;
mod method;
mod replay;
mod request;
mod response;
mod retry;
mod serde_helpers;
mod setting;
mod status;
mod telemetry;
mod throttle;

pub use concurrency::{ConcurrencyLimit, FreeThreshold, GroupKey};
pub use context::{EndpointContext, format_endpoint};
pub use method::Method;
pub use replay::ReplayMode;
pub use request::{RequestSpec, RequestSpecBuilder, TransportRequest};
pub use response::Response;
pub use retry::{Behavior, DelayOverride, RetryPolicy, RetryTrigger};
pub use serde_helpers::{base64_bytes, duration_secs};
pub use setting::Setting;
pub use status::{StatusSet, is_success};
pub use telemetry::{LogFormat, init_tracing, init_tracing_with};
pub use throttle::{Throttle, ThrottleRule};

/// Compiles `pattern` so it must match from the start of the input.
///
/// Throttle rules and concurrency limits use this form, so a pattern such as
/// `https://api/a` never matches a URL that merely contains it.
///
/// # Errors
///
/// Fails when `pattern` is not a valid regular expression.
pub fn anchored_regex(pattern: &str) -> Result<regex::Regex, regex::Error> {
    regex::Regex::new(&format!("^(?:{pattern})"))
}
