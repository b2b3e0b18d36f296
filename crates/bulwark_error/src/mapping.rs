//! Result mapping error types.

/// Why an accepted response could not be turned into a caller value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum MappingErrorKind {
    /// The mapper itself failed unexpectedly
    #[display("Failed to map response from {} ({}): {}", url, status, message)]
    Failed {
        /// Request URL
        url: String,
        /// Response status
        status: u16,
        /// Underlying failure
        message: String,
    },
    /// The parser was told to fail for this status
    #[display("{} responded {}: {}", url, status, message)]
    Declared {
        /// Request URL
        url: String,
        /// Response status
        status: u16,
        /// Caller-supplied explanation
        message: String,
    },
}

/// Mapping error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Mapping Error: {} at line {} in {}", kind, line, file)]
pub struct MappingError {
    kind: MappingErrorKind,
    line: u32,
    file: &'static str,
}

impl MappingError {
    /// Create a new mapping error with caller location tracking.
    #[track_caller]
    pub fn new(kind: MappingErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MappingErrorKind {
        &self.kind
    }
}
