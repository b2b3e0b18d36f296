//! Record/replay modes.

use serde::{Deserialize, Serialize};

/// How the engine interacts with a recording store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ReplayMode {
    /// Dispatch normally and persist every response
    Record,
    /// Serve every call from the store, never touching the network
    Replay,
    /// Serve from the store when a recording exists, otherwise dispatch and record
    SmartReplay,
}

impl ReplayMode {
    /// True when responses from the network are persisted.
    pub fn records(&self) -> bool {
        matches!(self, ReplayMode::Record | ReplayMode::SmartReplay)
    }

    /// True when recordings are consulted before dispatch.
    pub fn replays(&self) -> bool {
        matches!(self, ReplayMode::Replay | ReplayMode::SmartReplay)
    }
}
