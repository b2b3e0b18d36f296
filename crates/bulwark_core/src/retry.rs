//! Retry policy description.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// What to do once retries run out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Behavior {
    /// Surface the final error to the caller
    #[default]
    Break,
    /// Return an empty result instead of failing
    Pass,
}

/// A condition under which a rejected attempt is retried.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryTrigger {
    /// Retry when the response carries this status
    Status(u16),
    /// Retry on any transport failure
    Transport,
    /// Retry on transport failures of a specific kind (`Connect`, `Timeout`, ...)
    TransportKind(String),
    /// Retry when the named custom validator rejects the response
    Validator(String),
}

impl From<u16> for RetryTrigger {
    fn from(status: u16) -> Self {
        RetryTrigger::Status(status)
    }
}

/// Delay used for one iteration when the last attempt hit a given status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayOverride {
    /// Replacement delay
    #[serde(with = "crate::serde_helpers::duration_secs")]
    pub delay: Duration,
}

/// How failed attempts are retried.
///
/// `max_attempts` counts retries, so a policy with `max_attempts = 3` dispatches
/// at most four times. Every iteration after the first multiplies the running
/// delay by `modifier`.
///
/// # Examples
///
/// ```
/// use bulwark_core::{Behavior, RetryPolicy, RetryTrigger};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(Duration::from_secs(1), 3)
///     .with_modifier(1.5)
///     .with_retry_on(vec![RetryTrigger::Status(500)])
///     .with_behavior(Behavior::Pass);
///
/// assert_eq!(*policy.max_attempts(), 3);
/// assert!(policy.validate().is_ok());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct RetryPolicy {
    /// Base delay between attempts
    #[serde(with = "crate::serde_helpers::duration_secs")]
    delay: Duration,
    /// Number of retries after the first dispatch
    max_attempts: u32,
    /// Multiplier applied to the delay on each iteration after the first
    #[serde(default = "default_modifier")]
    modifier: f64,
    /// Triggers; empty means any rejection is retried
    #[serde(default)]
    retry_on: Vec<RetryTrigger>,
    /// Per-status delay replacements
    #[serde(default)]
    overrides: BTreeMap<u16, DelayOverride>,
    /// Final disposition once retries are exhausted
    #[serde(default)]
    behavior: Behavior,
}

fn default_modifier() -> f64 {
    1.0
}

impl RetryPolicy {
    /// Creates a policy with a constant delay that retries any rejection.
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
            modifier: default_modifier(),
            retry_on: Vec::new(),
            overrides: BTreeMap::new(),
            behavior: Behavior::Break,
        }
    }

    /// Adds a delay override for one status.
    pub fn with_override(mut self, status: u16, delay: Duration) -> Self {
        self.overrides.insert(status, DelayOverride { delay });
        self
    }

    /// Checks the numeric fields.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.modifier.is_nan() || self.modifier <= 0.0 {
            return Err(format!(
                "retry modifier must be greater than 0, got {}",
                self.modifier
            ));
        }
        if !self.modifier.is_finite() {
            return Err(format!("retry modifier must be finite, got {}", self.modifier));
        }
        Ok(())
    }
}
