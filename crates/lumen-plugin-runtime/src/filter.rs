//! Regex-based bootstrap filter.

use lumen_config::PluginsConfig;
use lumen_core::{LumenError, LumenResult};
use lumen_plugin_api::{FilterDecision, PluginFilter, PluginId};
use regex::RegexSet;

/// Classifies plugin ids with two pattern lists.
///
/// An id matches a list when any pattern matches anywhere in the id.
/// `disabled` wins over `deferred`.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    deferred: RegexSet,
    disabled: RegexSet,
}

impl PatternFilter {
    /// Compiles both lists. Invalid patterns are a configuration error.
    pub fn new<D, X>(deferred: D, disabled: X) -> LumenResult<Self>
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        X: IntoIterator,
        X::Item: AsRef<str>,
    {
        Ok(Self {
            deferred: compile("deferred", deferred)?,
            disabled: compile("disabled", disabled)?,
        })
    }

    /// Builds the filter from the `[plugins]` configuration section.
    pub fn from_config(config: &PluginsConfig) -> LumenResult<Self> {
        Self::new(&config.deferred, &config.disabled)
    }

    pub fn is_disabled(&self, id: &PluginId) -> bool {
        self.disabled.is_match(id.as_str())
    }

    pub fn is_deferred(&self, id: &PluginId) -> bool {
        self.deferred.is_match(id.as_str())
    }
}

fn compile<I>(list: &str, patterns: I) -> LumenResult<RegexSet>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    RegexSet::new(patterns)
        .map_err(|e| LumenError::configuration(format!("invalid {} plugin pattern: {}", list, e)))
}

impl PluginFilter for PatternFilter {
    fn decide(&self, id: &PluginId) -> FilterDecision {
        if self.is_disabled(id) {
            FilterDecision::Disabled
        } else if self.is_deferred(id) {
            FilterDecision::Deferred
        } else {
            FilterDecision::Enabled
        }
    }
}
