//! Filesystem-based recording store.
//!
//! Each recording is a JSON document named after the digest of its request
//! signature, fanned out into two-character subdirectories.

use crate::signature_digest;
use async_trait::async_trait;
use bulwark_error::{StorageError, StorageErrorKind};
use bulwark_interface::{Recording, RecordingHandle, RecordingStore, RequestSignature};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Filesystem recording backend.
///
/// Layout: `{base_path}/{digest[0:2]}/{digest}.json`
///
/// ```text
/// /tmp/recordings/
/// ├── 3f/
/// │   └── 3fa1...e9.json
/// └── c0/
///     └── c04b...12.json
/// ```
///
/// Writes go to a temporary file first and are renamed into place, so a
/// reader never sees a half-written recording.
#[derive(Debug, Clone)]
pub struct FileSystemRecordingStore {
    base_path: PathBuf,
}

impl FileSystemRecordingStore {
    /// Create a new filesystem store, creating the base directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Created recording store");
        Ok(Self { base_path })
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn path_for(&self, digest: &str) -> PathBuf {
        let shard = digest.get(0..2).unwrap_or("00");
        self.base_path.join(shard).join(format!("{digest}.json"))
    }

    async fn read(&self, digest: &str) -> Result<Option<Recording>, StorageError> {
        let path = self.path_for(digest);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                ))));
            }
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            StorageError::new(StorageErrorKind::Serialization(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })
    }
}

#[async_trait]
impl RecordingStore for FileSystemRecordingStore {
    #[tracing::instrument(skip(self, recording), fields(url = %recording.signature().url()))]
    async fn record(&self, recording: &Recording) -> Result<RecordingHandle, StorageError> {
        let digest = signature_digest(recording.signature());
        let path = self.path_for(&digest);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let json = serde_json::to_vec_pretty(recording).map_err(|e| {
            StorageError::new(StorageErrorKind::Serialization(e.to_string()))
        })?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &json).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::info!(
            digest = %digest,
            path = %path.display(),
            status = *recording.response().status(),
            "Stored recording"
        );
        Ok(RecordingHandle(digest))
    }

    #[tracing::instrument(skip(self, signature), fields(url = %signature.url()))]
    async fn find(
        &self,
        signature: &RequestSignature,
        discard_before: Option<DateTime<Utc>>,
    ) -> Result<Option<RecordingHandle>, StorageError> {
        let digest = signature_digest(signature);
        let Some(recording) = self.read(&digest).await? else {
            tracing::debug!("No recording found");
            return Ok(None);
        };
        if let Some(cutoff) = discard_before {
            if *recording.recorded_at() < cutoff {
                tracing::debug!(
                    recorded_at = %recording.recorded_at(),
                    cutoff = %cutoff,
                    "Discarding stale recording"
                );
                return Ok(None);
            }
        }
        Ok(Some(RecordingHandle(digest)))
    }

    #[tracing::instrument(skip(self), fields(digest = %handle))]
    async fn load(&self, handle: &RecordingHandle) -> Result<Recording, StorageError> {
        self.read(&handle.0)
            .await?
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(handle.0.clone())))
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}
