//! Transport failure types.

/// Why a dispatch produced no response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum TransportErrorKind {
    /// Could not reach the host
    #[display("Connection failed: {}", _0)]
    Connect(String),
    /// No response within the configured timeout
    #[display("Timed out after {}ms", _0)]
    Timeout(u64),
    /// Reading or writing the exchange failed
    #[display("I/O failure: {}", _0)]
    Io(String),
    /// Replay mode found no recording for the request
    #[display("No recording for {}", _0)]
    ReplayMissing(String),
    /// Anything else the transport reported
    #[display("{}", _0)]
    Other(String),
}

impl TransportErrorKind {
    /// Short label used to match retry triggers and build cause strings.
    pub fn label(&self) -> &'static str {
        match self {
            TransportErrorKind::Connect(_) => "Connect",
            TransportErrorKind::Timeout(_) => "Timeout",
            TransportErrorKind::Io(_) => "Io",
            TransportErrorKind::ReplayMissing(_) => "ReplayMissing",
            TransportErrorKind::Other(_) => "Other",
        }
    }
}

/// Transport failure with location tracking.
///
/// # Examples
///
/// ```
/// use bulwark_error::{TransportError, TransportErrorKind};
///
/// let err = TransportError::new(TransportErrorKind::Timeout(500));
/// assert_eq!(err.kind().label(), "Timeout");
/// assert!(err.to_string().contains("500ms"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Transport Error: {} at line {} in {}", kind, line, file)]
pub struct TransportError {
    kind: TransportErrorKind,
    line: u32,
    file: &'static str,
}

impl TransportError {
    /// Create a new transport error with caller location tracking.
    #[track_caller]
    pub fn new(kind: TransportErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TransportErrorKind {
        &self.kind
    }
}
