//! Outcome of a bulk activation pass.

use lumen_plugin_api::{PluginError, PluginId};
use std::fmt;

/// A plugin that failed during a bulk pass.
#[derive(Debug, Clone)]
pub struct PluginFailure {
    pub id: PluginId,
    pub error: PluginError,
}

/// What a call to `activate_all` or `activate_deferred` did.
///
/// Bulk activation never fails as a whole; per-plugin failures land here.
#[derive(Debug, Clone, Default)]
pub struct ActivationReport {
    /// Activated (or already active) plugins, in candidate order.
    pub activated: Vec<PluginId>,
    /// Plugins whose activation failed.
    pub failed: Vec<PluginFailure>,
    /// Plugins held back for the deferred phase.
    pub deferred: Vec<PluginId>,
    /// Plugins a filter disabled.
    pub skipped: Vec<PluginId>,
}

impl ActivationReport {
    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids of the failed plugins.
    #[must_use]
    pub fn failed_ids(&self) -> Vec<&PluginId> {
        self.failed.iter().map(|failure| &failure.id).collect()
    }

    /// Looks up the failure recorded for `id`.
    #[must_use]
    pub fn failure(&self, id: &PluginId) -> Option<&PluginError> {
        self.failed
            .iter()
            .find(|failure| &failure.id == id)
            .map(|failure| &failure.error)
    }

    /// Folds another pass into this one.
    pub fn merge(&mut self, other: Self) {
        self.activated.extend(other.activated);
        self.failed.extend(other.failed);
        self.deferred.extend(other.deferred);
        self.skipped.extend(other.skipped);
    }

    pub(crate) fn record(&mut self, id: PluginId, result: Result<(), PluginError>) {
        match result {
            Ok(()) => self.activated.push(id),
            Err(error) => self.failed.push(PluginFailure { id, error }),
        }
    }
}

impl fmt::Display for ActivationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} activated, {} failed, {} deferred, {} skipped",
            self.activated.len(),
            self.failed.len(),
            self.deferred.len(),
            self.skipped.len()
        )
    }
}
