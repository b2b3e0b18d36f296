//! Retry exhaustion.

use crate::BulwarkError;

/// Every permitted retry was used without an accepted attempt.
///
/// Carries the final rejection as its source.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display(
    "Retry Exhausted Error: {} gave up after {} dispatches ({} retries allowed), last cause {} at line {} in {}",
    url,
    dispatches,
    max_attempts,
    cause,
    line,
    file
)]
pub struct RetryExhaustedError {
    url: String,
    dispatches: u32,
    max_attempts: u32,
    cause: String,
    source: Box<BulwarkError>,
    line: u32,
    file: &'static str,
}

impl RetryExhaustedError {
    /// Create a new exhaustion error with caller location tracking.
    #[track_caller]
    pub fn new(
        url: impl Into<String>,
        dispatches: u32,
        max_attempts: u32,
        cause: impl Into<String>,
        last: BulwarkError,
    ) -> Self {
        let location = std::panic::Location::caller();
        Self {
            url: url.into(),
            dispatches,
            max_attempts,
            cause: cause.into(),
            source: Box::new(last),
            line: location.line(),
            file: location.file(),
        }
    }

    /// URL of the exhausted call.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Total dispatches made, including the original.
    pub fn dispatches(&self) -> u32 {
        self.dispatches
    }

    /// Retry cap from the policy.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Cause label of the final attempt.
    pub fn cause(&self) -> &str {
        &self.cause
    }

    /// The final rejection or transport failure.
    pub fn last(&self) -> &BulwarkError {
        &self.source
    }
}
