//! Configuration error types.

/// What was wrong with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ConfigErrorKind {
    /// A throttle rule failed validation
    #[display("Invalid throttle rule: {}", _0)]
    Throttle(String),
    /// A retry policy failed validation
    #[display("Invalid retry policy: {}", _0)]
    Retry(String),
    /// A concurrency limit failed validation
    #[display("Invalid concurrency limit: {}", _0)]
    Concurrency(String),
    /// An endpoint template could not be formatted
    #[display("Invalid endpoint: {}", _0)]
    Endpoint(String),
    /// A configuration file could not be read or parsed
    #[display("Failed to load configuration: {}", _0)]
    Load(String),
    /// Any other invalid value
    #[display("{}", _0)]
    Invalid(String),
}

/// Configuration error with source location.
///
/// Raised eagerly when configuration is built, never mid-call.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    line: u32,
    file: &'static str,
}

impl ConfigError {
    /// Create a new configuration error at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulwark_error::{ConfigError, ConfigErrorKind};
    ///
    /// let err = ConfigError::new(ConfigErrorKind::Retry("modifier must be positive".into()));
    /// assert!(err.to_string().contains("modifier"));
    /// ```
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ConfigErrorKind {
        &self.kind
    }
}
