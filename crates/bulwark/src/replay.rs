//! Record/replay settings.

use bulwark_core::ReplayMode;
use bulwark_interface::RecordingStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// How an engine records and replays responses.
///
/// # Examples
///
/// ```
/// use bulwark::ReplaySettings;
/// use bulwark_core::ReplayMode;
/// use bulwark_storage::MemoryRecordingStore;
/// use std::sync::Arc;
///
/// let settings = ReplaySettings::new(ReplayMode::SmartReplay, Arc::new(MemoryRecordingStore::new()))
///     .with_discard_bad_responses(true)
///     .with_disable_throttling(true);
/// assert!(settings.mode().replays());
/// ```
#[derive(Clone, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct ReplaySettings {
    /// Record, replay or both
    #[setters(skip)]
    mode: ReplayMode,
    /// Where recordings live
    #[setters(skip)]
    store: Arc<dyn RecordingStore>,
    /// Recordings older than this are ignored
    #[setters(strip_option)]
    discard_before: Option<DateTime<Utc>>,
    /// Treat stored non-2xx responses as missing
    discard_bad_responses: bool,
    /// Skip throttling for calls served from a recording
    disable_throttling: bool,
}

impl ReplaySettings {
    /// Creates settings with nothing discarded and throttling kept.
    pub fn new(mode: ReplayMode, store: Arc<dyn RecordingStore>) -> Self {
        Self {
            mode,
            store,
            discard_before: None,
            discard_bad_responses: false,
            disable_throttling: false,
        }
    }
}

impl std::fmt::Debug for ReplaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaySettings")
            .field("mode", &self.mode)
            .field("store", &self.store.name())
            .field("discard_before", &self.discard_before)
            .field("discard_bad_responses", &self.discard_bad_responses)
            .field("disable_throttling", &self.disable_throttling)
            .finish()
    }
}
