//! Hook failure type.

/// A before/after hook failed.
///
/// The engine logs these and carries on; they never reach the caller.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Hook Error: {} at line {} in {}", message, line, file)]
pub struct HookError {
    /// The underlying error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl HookError {
    /// Create a new hook error with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulwark_error::HookError;
    ///
    /// let err = HookError::new("lock poisoned");
    /// assert!(err.message.contains("poisoned"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
