//! Tracking events emitted while a call is processed.

use crate::AttemptOutcome;
use bulwark_core::{EndpointContext, GroupKey, ThrottleRule};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Read-only view of the retry loop at one point in time.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct RetrySnapshot {
    /// Retry number; the original dispatch is attempt 0
    attempt: u32,
    /// Retry cap
    max_attempts: u32,
    /// Delay that precedes the next attempt
    delay: Duration,
    /// Why the last attempt failed, or `SUCCESSFUL`
    cause: String,
    /// Status of the last response, if there was one
    last_status: Option<u16>,
}

impl RetrySnapshot {
    /// Creates a snapshot.
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        cause: impl Into<String>,
        last_status: Option<u16>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            delay,
            cause: cause.into(),
            last_status,
        }
    }
}

/// One dispatch finished, successfully or not.
#[derive(Debug)]
pub struct DispatchEvent<'a> {
    /// Call context
    pub context: &'a EndpointContext,
    /// Response or transport failure
    pub outcome: &'a AttemptOutcome,
    /// Retry state when this dispatch was a retry
    pub retry: Option<&'a RetrySnapshot>,
    /// Wall-clock time the dispatch finished
    pub timestamp: DateTime<Utc>,
    /// Time spent inside the transport
    pub elapsed: Duration,
}

/// Throttle wait transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ThrottlePhase {
    /// A rule forced the caller to wait
    LimitReached,
    /// The wait finished
    WaitOver,
}

/// A throttle rule made a caller wait.
#[derive(Debug)]
pub struct ThrottleEvent<'a> {
    /// Call context
    pub context: &'a EndpointContext,
    /// Rule that required the wait
    pub rule: &'a ThrottleRule,
    /// Wait length
    pub wait: Duration,
    /// Matching requests inside the window when the wait began
    pub current: usize,
    /// Transition
    pub phase: ThrottlePhase,
}

/// Concurrency gate transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ConcurrencyPhase {
    /// The group is full and callers now block
    Blocked,
    /// Enough holders completed and callers are admitted again
    Freed,
}

/// A concurrency group changed state.
#[derive(Debug)]
pub struct ConcurrencyEvent<'a> {
    /// Context of the caller that observed the transition
    pub context: &'a EndpointContext,
    /// Group that changed
    pub group_key: &'a GroupKey,
    /// Configured limit
    pub limit: usize,
    /// Holders at the time of the transition
    pub in_flight: usize,
    /// Transition
    pub phase: ConcurrencyPhase,
}

/// Retry loop transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum RetryPhase {
    /// Another attempt is about to be made after the snapshot's delay
    BeforeRetry,
    /// A retry was accepted
    Succeeded,
    /// No attempts remain
    Exhausted,
}

/// The retry loop changed state.
#[derive(Debug)]
pub struct RetryEvent<'a> {
    /// Call context
    pub context: &'a EndpointContext,
    /// State after the transition
    pub snapshot: &'a RetrySnapshot,
    /// Transition
    pub phase: RetryPhase,
}
