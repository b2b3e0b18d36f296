//! Error types for the Bulwark HTTP resilience engine.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! [`BulwarkError`] is the umbrella returned by the engine. It distinguishes
//! transport failures, validator rejections, retry exhaustion, configuration
//! mistakes, mapping failures and storage failures.
//!
//! # Examples
//!
//! ```
//! use bulwark_error::{BulwarkResult, TransportError, TransportErrorKind};
//!
//! fn fetch() -> BulwarkResult<String> {
//!     Err(TransportError::new(TransportErrorKind::Timeout(250)))?
//! }
//!
//! match fetch() {
//!     Ok(body) => println!("Got: {}", body),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;
mod hook;
mod mapping;
mod rejection;
mod retry;
mod storage;
mod transport;

pub use builder::{BuilderError, BuilderErrorKind};
pub use config::{ConfigError, ConfigErrorKind};
pub use error::{BulwarkError, BulwarkErrorKind, BulwarkResult};
pub use hook::HookError;
pub use mapping::{MappingError, MappingErrorKind};
pub use rejection::{RejectionError, RejectionErrorKind};
pub use retry::RetryExhaustedError;
pub use storage::{StorageError, StorageErrorKind};
pub use transport::{TransportError, TransportErrorKind};
