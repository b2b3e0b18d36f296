//! In-memory recording store.

use crate::signature_digest;
use async_trait::async_trait;
use bulwark_error::{StorageError, StorageErrorKind};
use bulwark_interface::{Recording, RecordingHandle, RecordingStore, RequestSignature};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps recordings in memory for the lifetime of the store.
#[derive(Debug, Default)]
pub struct MemoryRecordingStore {
    recordings: RwLock<HashMap<String, Recording>>,
}

impl MemoryRecordingStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored recordings.
    pub async fn len(&self) -> usize {
        self.recordings.read().await.len()
    }

    /// True when nothing has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.recordings.read().await.is_empty()
    }
}

#[async_trait]
impl RecordingStore for MemoryRecordingStore {
    #[tracing::instrument(skip(self, recording), fields(url = %recording.signature().url()))]
    async fn record(&self, recording: &Recording) -> Result<RecordingHandle, StorageError> {
        let digest = signature_digest(recording.signature());
        self.recordings
            .write()
            .await
            .insert(digest.clone(), recording.clone());
        tracing::debug!(digest = %digest, "Stored recording in memory");
        Ok(RecordingHandle(digest))
    }

    async fn find(
        &self,
        signature: &RequestSignature,
        discard_before: Option<DateTime<Utc>>,
    ) -> Result<Option<RecordingHandle>, StorageError> {
        let digest = signature_digest(signature);
        let recordings = self.recordings.read().await;
        let found = recordings.get(&digest).filter(|recording| {
            discard_before.is_none_or(|cutoff| *recording.recorded_at() >= cutoff)
        });
        Ok(found.map(|_| RecordingHandle(digest)))
    }

    async fn load(&self, handle: &RecordingHandle) -> Result<Recording, StorageError> {
        self.recordings
            .read()
            .await
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(handle.0.clone())))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
