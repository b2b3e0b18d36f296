//! Recording storage error types.

/// Kinds of recording storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create the recordings directory
    #[display("Failed to create recordings directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write a recording
    #[display("Failed to write recording: {}", _0)]
    FileWrite(String),
    /// Failed to read a recording
    #[display("Failed to read recording: {}", _0)]
    FileRead(String),
    /// No recording under the given handle
    #[display("Recording not found: {}", _0)]
    NotFound(String),
    /// A recording could not be encoded or decoded
    #[display("Recording serialization failed: {}", _0)]
    Serialization(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use bulwark_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("abc123".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
