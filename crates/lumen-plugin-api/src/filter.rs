//! Bootstrap filtering of eager activation.

use lumen_core::PluginId;
use serde::{Deserialize, Serialize};

/// What bulk activation should do with a candidate plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDecision {
    /// Activate now.
    Enabled,
    /// Hold back until the deferred phase.
    Deferred,
    /// Do not activate eagerly.
    Disabled,
}

/// Decides, per plugin id, how bulk activation treats a plugin.
///
/// Filters only affect eager activation. A filtered plugin that another
/// plugin requires is still activated on demand.
pub trait PluginFilter: Send + Sync {
    fn decide(&self, id: &PluginId) -> FilterDecision;
}

impl<F> PluginFilter for F
where
    F: Fn(&PluginId) -> FilterDecision + Send + Sync,
{
    fn decide(&self, id: &PluginId) -> FilterDecision {
        self(id)
    }
}

/// Filter that enables everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PluginFilter for AllowAll {
    fn decide(&self, _id: &PluginId) -> FilterDecision {
        FilterDecision::Enabled
    }
}
