//! Settings registry plugin.

use super::SETTINGS;
use crate::shell::Shell;
use lumen_plugin_api::{AutoStart, PluginDescriptor, PluginResult};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const PLUGIN_ID: &str = "@lumen/settings:plugin";

/// Key/value settings shared by plugins.
#[derive(Debug, Default)]
pub struct SettingRegistry {
    values: RwLock<BTreeMap<String, Value>>,
}

impl SettingRegistry {
    /// Registry seeded with the shell defaults.
    pub fn with_defaults() -> Self {
        let registry = Self::default();
        registry.set("theme", json!("light"));
        registry.set("status_bar.visible", json!(true));
        registry
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Returns the value as a string, if it is one.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Stores a value, returning the previous one.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.write().insert(key.into(), value)
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }
}

pub fn plugin() -> PluginResult<PluginDescriptor<Shell>> {
    PluginDescriptor::builder(PLUGIN_ID)
        .description("Shared settings registry")
        .provides(&SETTINGS)
        .auto_start(AutoStart::Always)
        .activate(|_shell, _deps| async { Ok(SettingRegistry::with_defaults()) })
        .build()
}
