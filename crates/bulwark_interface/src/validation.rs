//! Response validation, hooks and result mapping seams.

use crate::{AttemptOutcome, RetrySnapshot};
use async_trait::async_trait;
use bulwark_core::{EndpointContext, Response};
use bulwark_error::{HookError, MappingError, RejectionErrorKind};

/// Decides whether a completed response is acceptable.
pub trait Validator: Send + Sync {
    /// Name reported in rejections and matched by retry triggers.
    fn name(&self) -> &str;

    /// Returns `Err` with the reason when the response is refused.
    fn check(&self, response: &Response) -> Result<(), RejectionErrorKind>;
}

/// Code run around every dispatch.
///
/// Failures are logged by the engine and never reach the caller.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Hook name for logging.
    fn name(&self) -> &str;

    /// Runs before each dispatch, ahead of throttling.
    async fn before(&self, _context: &EndpointContext) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs after each dispatch with its outcome and, for retries, the retry state.
    async fn after(
        &self,
        _context: &EndpointContext,
        _outcome: &AttemptOutcome,
        _retry: Option<&RetrySnapshot>,
    ) -> Result<(), HookError> {
        Ok(())
    }
}

/// Turns an accepted response into a caller value.
///
/// `Ok(None)` means the response is valid but carries no value.
pub trait ResultMapper<T>: Send + Sync {
    /// Maps one response.
    fn map(&self, response: &Response) -> Result<Option<T>, MappingError>;
}

impl<T, F> ResultMapper<T> for F
where
    F: Fn(&Response) -> Result<Option<T>, MappingError> + Send + Sync,
{
    fn map(&self, response: &Response) -> Result<Option<T>, MappingError> {
        self(response)
    }
}
