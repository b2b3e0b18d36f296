//! Validation rejection types.

use bulwark_core::Response;

/// Why a validator refused a response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum RejectionErrorKind {
    /// Status outside 2xx and not explicitly allowed
    #[display("{} raised {}, but it was expecting any successful status code", url, status)]
    NonOk {
        /// Request URL
        url: String,
        /// Received status
        status: u16,
    },
    /// Status outside the strict set
    #[display("{} raised {}, but it was expecting {}", url, status, expected)]
    Unexpected {
        /// Request URL
        url: String,
        /// Received status
        status: u16,
        /// Rendered list of accepted statuses
        expected: String,
    },
    /// A custom validator refused the response
    #[display("{} was rejected as {}: {}", url, kind, message)]
    UserDefined {
        /// Request URL
        url: String,
        /// Caller-chosen classification, used by retry triggers
        kind: String,
        /// Human-readable explanation
        message: String,
    },
}

impl RejectionErrorKind {
    /// Status code carried by the rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            RejectionErrorKind::NonOk { status, .. }
            | RejectionErrorKind::Unexpected { status, .. } => Some(*status),
            RejectionErrorKind::UserDefined { .. } => None,
        }
    }
}

/// A response a validator refused, kept alongside the reason.
///
/// # Examples
///
/// ```
/// use bulwark_core::{Method, Response};
/// use bulwark_error::{RejectionError, RejectionErrorKind};
///
/// let response = Response::new(500, Method::Get, "http://api/x");
/// let err = RejectionError::new(
///     RejectionErrorKind::NonOk { url: "http://api/x".into(), status: 500 },
///     "default",
///     response,
/// );
/// assert_eq!(err.validator(), "default");
/// assert_eq!(*err.response().status(), 500);
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Rejection Error: {} at line {} in {}", kind, line, file)]
pub struct RejectionError {
    kind: RejectionErrorKind,
    validator: String,
    response: Box<Response>,
    line: u32,
    file: &'static str,
}

impl RejectionError {
    /// Create a new rejection with caller location tracking.
    #[track_caller]
    pub fn new(kind: RejectionErrorKind, validator: impl Into<String>, response: Response) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            validator: validator.into(),
            response: Box::new(response),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RejectionErrorKind {
        &self.kind
    }

    /// Name of the validator that refused the response.
    pub fn validator(&self) -> &str {
        &self.validator
    }

    /// The refused response.
    pub fn response(&self) -> &Response {
        &self.response
    }
}
