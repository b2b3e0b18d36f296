//! Bulwark - resilience for outbound HTTP calls
//!
//! Bulwark sits in front of an HTTP transport and decides, for every call,
//! whether to wait, how many calls may be in flight, whether a failure is
//! retried and with what backoff, and whether the final outcome is a value,
//! a tolerated failure or an error.
//!
//! # Features
//!
//! - **Throttling**: sliding-window rules per URL pattern, worst rule governs
//! - **Concurrency limits**: per endpoint and argument group, released on drop
//! - **Retries**: multiplicative backoff, per-status delay overrides, triggers
//! - **Validation**: default, strict-status and allowed-status validators
//! - **Layered config**: tri-state settings merged per client, namespace and call
//! - **Record/replay**: serve recorded responses for deterministic runs
//! - **Reporting**: per-endpoint statistics gathered from engine events
//! - **Pagination**: token or offset walks over list endpoints
//!
//! # Quick Start
//!
//! ```no_run
//! use bulwark::{
//!     Client, ClientConfig, Engine, EngineSettings, ReqwestTransport, RetryPolicy, StatusSet,
//!     Throttle, ThrottleRule, TracingSink,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Arc::new(
//!     Engine::new(Arc::new(ReqwestTransport::new()), EngineSettings::default())
//!         .with_sink(Arc::new(TracingSink)),
//! );
//!
//! let config = ClientConfig::default()
//!     .with_retry(RetryPolicy::new(Duration::from_secs(1), 3).with_modifier(1.5))
//!     .with_throttle(Throttle::from(ThrottleRule::new(".*", 10, Duration::from_secs(1))?))
//!     .with_allowed_status(StatusSet::from(404));
//!
//! let client = Client::new(engine, "https://pokeapi.co/api/v2", config)?;
//! let ditto = client.get("/pokemon/ditto").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! Bulwark is organized as a workspace with focused crates:
//!
//! - `bulwark_core` - Plain data: responses, contexts, rules, settings
//! - `bulwark_error` - Error types
//! - `bulwark_interface` - Transport, recording store, sink and hook traits
//! - `bulwark_rate_limit` - Rate tracker, throttle engine, concurrency limiter
//! - `bulwark_storage` - Recording stores for replay
//!
//! This crate (`bulwark`) adds the orchestrator and re-exports everything for
//! convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod engine;
mod hooks;
pub mod observability;
mod paginator;
mod parser;
mod replay;
mod report;
mod retry;
mod sinks;
mod transport;
mod validators;

pub use client::Client;
pub use config::{
    ClientConfig, ConcurrencyEntry, FileConfig, ResolvedConfig, ThrottleRuleEntry,
};
pub use engine::{Engine, EngineSettings, EngineSettingsBuilder};
pub use hooks::{PauseScope, RetryAfterHook};
pub use paginator::{DEFAULT_PAGE_SIZE, Paginator};
pub use parser::{JsonParser, ParseAction, StatusParser};
pub use replay::ReplaySettings;
pub use report::{Report, ReportBuilder, ReportRow, TOTAL};
pub use retry::{RetryState, SUCCESSFUL, cause_of, should_retry};
pub use sinks::TracingSink;
pub use transport::ReqwestTransport;
pub use validators::{AllowedStatusValidator, DefaultValidator, StrictStatusValidator};

// Re-export the component crates
pub use bulwark_core::*;
pub use bulwark_error::*;
pub use bulwark_interface::*;
pub use bulwark_rate_limit::*;
pub use bulwark_storage::*;
