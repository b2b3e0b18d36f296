//! Recording storage for Bulwark record/replay.
//!
//! Two [`RecordingStore`](bulwark_interface::RecordingStore) backends are
//! provided:
//!
//! - [`MemoryRecordingStore`] keeps recordings in a map, for tests
//! - [`FileSystemRecordingStore`] writes one JSON file per request signature
//!
//! Recordings are keyed by a SHA-256 digest of the request signature, so a
//! newer recording for the same request replaces the older one.
//!
//! # Example
//!
//! ```rust
//! use bulwark_core::{Method, Response};
//! use bulwark_interface::{Recording, RecordingStore, RequestSignature};
//! use bulwark_storage::FileSystemRecordingStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileSystemRecordingStore::new("/tmp/bulwark-recordings")?;
//! let signature = RequestSignature::new(Method::Get, "https://api/pokemon/ditto", None);
//! let response = Response::new(200, Method::Get, "https://api/pokemon/ditto");
//!
//! store.record(&Recording::new(signature.clone(), response)).await?;
//! if let Some(handle) = store.find(&signature, None).await? {
//!     let recording = store.load(&handle).await?;
//!     assert_eq!(*recording.response().status(), 200);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod digest;
mod filesystem;
mod memory;

pub use bulwark_error::{StorageError, StorageErrorKind};
pub use digest::signature_digest;
pub use filesystem::FileSystemRecordingStore;
pub use memory::MemoryRecordingStore;
