//! Plugin lifecycle state and registry snapshots.

use crate::AutoStart;
use chrono::{DateTime, Utc};
use lumen_core::PluginId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Plugin lifecycle state.
///
/// `Activated` and `Failed` are terminal. A failed plugin only comes back
/// by being deregistered and registered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// Registered, activation not requested yet.
    Pending,
    /// Activation requested; dependencies or the activation body are running.
    Activating,
    /// Activation finished and the service is cached.
    Activated,
    /// Activation failed and the error is cached.
    Failed,
}

impl PluginState {
    /// Returns true for `Activated` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Activated | Self::Failed)
    }

    /// Returns the state name as used in logs and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a registered plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: PluginId,
    pub description: Option<String>,
    pub state: PluginState,
    pub auto_start: AutoStart,
    pub provides: Option<String>,
    pub requires: Vec<String>,
    pub optional: Vec<String>,
    /// When the activation body started running.
    pub started_at: Option<DateTime<Utc>>,
    /// When the plugin reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Registry-wide sequence number taken when the body started.
    pub started_seq: Option<u64>,
    /// Registry-wide sequence number taken when the plugin reached a terminal state.
    pub finished_seq: Option<u64>,
    /// Cached failure message, if the plugin failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
