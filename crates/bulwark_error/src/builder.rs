//! Errors from assembling requests and engine settings.

/// Why a request or settings value could not be assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BuilderErrorKind {
    /// A generated builder was missing a required field
    #[display("Incomplete builder: {}", _0)]
    Incomplete(String),

    /// The concurrency poll interval was zero
    #[display("Concurrency poll interval must be greater than zero")]
    ZeroPollInterval,
}

/// A builder failure, located at the call that raised it.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Builder Error: {} at line {} in {}", kind, line, file)]
pub struct BuilderError {
    kind: BuilderErrorKind,
    line: u32,
    file: &'static str,
}

impl BuilderError {
    /// Records `kind` at the caller's location.
    #[track_caller]
    pub fn new(kind: BuilderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// What went wrong.
    pub fn kind(&self) -> &BuilderErrorKind {
        &self.kind
    }
}

/// Generated builders report missing fields as a message.
impl From<String> for BuilderError {
    #[track_caller]
    fn from(msg: String) -> Self {
        Self::new(BuilderErrorKind::Incomplete(msg))
    }
}
