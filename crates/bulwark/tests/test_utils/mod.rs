//! Test utilities for Bulwark tests.
//!
//! This module provides a scripted transport and an event-recording sink.

#![allow(dead_code)]

pub mod event_log;
pub mod mock_transport;

#[allow(unused_imports)]
pub use event_log::EventLog;
#[allow(unused_imports)]
pub use mock_transport::{MockReply, MockTransport};
