//! Trait definitions for the Bulwark HTTP resilience engine.
//!
//! This crate defines the seams the engine talks through: the outbound
//! [`Transport`], the replay [`RecordingStore`], the event [`Sink`], and the
//! caller-supplied [`Validator`], [`Hook`] and [`ResultMapper`] extensions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod events;
mod recording;
mod sink;
mod transport;
mod validation;

pub use events::{
    ConcurrencyEvent, ConcurrencyPhase, DispatchEvent, RetryEvent, RetryPhase, RetrySnapshot,
    ThrottleEvent, ThrottlePhase,
};
pub use recording::{Recording, RecordingHandle, RecordingStore, RequestSignature};
pub use sink::{FanoutSink, NullSink, Sink};
pub use transport::{AttemptOutcome, Transport};
pub use validation::{Hook, ResultMapper, Validator};
