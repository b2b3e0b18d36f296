//! The outbound HTTP boundary.

use async_trait::async_trait;
use bulwark_core::{Response, TransportRequest};
use bulwark_error::TransportError;

/// Sends one request and returns whatever the server answered.
///
/// Implementations must not interpret status codes: a 500 is still a
/// `Response`. Only failures that produced no response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dispatch a single request.
    async fn dispatch(&self, request: &TransportRequest) -> Result<Response, TransportError>;

    /// Transport name for logging.
    fn name(&self) -> &str {
        "transport"
    }
}

/// Result of one dispatch: a response or a transport failure.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The server answered
    Response(Response),
    /// No response was produced
    Failed(TransportError),
}

impl AttemptOutcome {
    /// The response, when there is one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            AttemptOutcome::Response(response) => Some(response),
            AttemptOutcome::Failed(_) => None,
        }
    }

    /// The transport failure, when there is one.
    pub fn error(&self) -> Option<&TransportError> {
        match self {
            AttemptOutcome::Response(_) => None,
            AttemptOutcome::Failed(err) => Some(err),
        }
    }

    /// Status code of the response, if any.
    pub fn status(&self) -> Option<u16> {
        self.response().map(|response| *response.status())
    }
}

impl From<Result<Response, TransportError>> for AttemptOutcome {
    fn from(result: Result<Response, TransportError>) -> Self {
        match result {
            Ok(response) => AttemptOutcome::Response(response),
            Err(err) => AttemptOutcome::Failed(err),
        }
    }
}
