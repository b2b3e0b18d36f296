//! Top-level error wrapper types.

use crate::{
    BuilderError, ConfigError, MappingError, RejectionError, RetryExhaustedError, StorageError,
    TransportError,
};

/// Every failure a Bulwark call can surface.
///
/// # Examples
///
/// ```
/// use bulwark_error::{BulwarkError, TransportError, TransportErrorKind};
///
/// let err: BulwarkError = TransportError::new(TransportErrorKind::Connect("refused".into())).into();
/// assert!(format!("{}", err).contains("Transport Error"));
/// assert!(err.is_transport());
/// ```
#[derive(Debug, Clone, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum BulwarkErrorKind {
    /// The transport produced no response
    #[from(TransportError)]
    Transport(TransportError),
    /// A validator refused the response
    #[from(RejectionError)]
    Rejection(RejectionError),
    /// Retries ran out
    #[from(RetryExhaustedError)]
    RetryExhausted(RetryExhaustedError),
    /// Invalid configuration
    #[from(ConfigError)]
    Config(ConfigError),
    /// An accepted response could not be mapped
    #[from(MappingError)]
    Mapping(MappingError),
    /// Recording storage failed
    #[from(StorageError)]
    Storage(StorageError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
}

/// Bulwark error with kind discrimination.
///
/// # Examples
///
/// ```
/// use bulwark_error::{BulwarkResult, ConfigError, ConfigErrorKind};
///
/// fn might_fail() -> BulwarkResult<()> {
///     Err(ConfigError::new(ConfigErrorKind::Invalid("missing base url".into())))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Bulwark Error: {}", _0)]
pub struct BulwarkError(Box<BulwarkErrorKind>);

impl BulwarkError {
    /// Create a new error from a kind.
    pub fn new(kind: BulwarkErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &BulwarkErrorKind {
        &self.0
    }

    /// True for a transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(*self.0, BulwarkErrorKind::Transport(_))
    }

    /// True for a validator rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(*self.0, BulwarkErrorKind::Rejection(_))
    }

    /// True when retries ran out.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(*self.0, BulwarkErrorKind::RetryExhausted(_))
    }

    /// The status code of the response behind this error, if any.
    pub fn status(&self) -> Option<u16> {
        match &*self.0 {
            BulwarkErrorKind::Rejection(err) => Some(*err.response().status()),
            BulwarkErrorKind::RetryExhausted(err) => err.last().status(),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to BulwarkErrorKind
impl<T> From<T> for BulwarkError
where
    T: Into<BulwarkErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Bulwark operations.
pub type BulwarkResult<T> = std::result::Result<T, BulwarkError>;
