//! Command registry plugin.

use super::COMMANDS;
use crate::shell::Shell;
use indexmap::IndexMap;
use lumen_plugin_api::{PluginDescriptor, PluginResult};
use parking_lot::RwLock;

pub const PLUGIN_ID: &str = "@lumen/commands:plugin";

/// A command contributed by a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: String,
    pub label: String,
}

/// Commands in the order they were added.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: RwLock<IndexMap<String, Command>>,
}

impl CommandRegistry {
    /// Adds a command. Returns false if the id is taken.
    pub fn add(&self, id: impl Into<String>, label: impl Into<String>) -> bool {
        let id = id.into();
        let mut commands = self.commands.write();
        if commands.contains_key(&id) {
            tracing::warn!(command = %id, "Command already registered");
            return false;
        }
        let label = label.into();
        commands.insert(id.clone(), Command { id, label });
        true
    }

    pub fn has(&self, id: &str) -> bool {
        self.commands.read().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Command> {
        self.commands.read().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.commands.read().keys().cloned().collect()
    }
}

pub fn plugin() -> PluginResult<PluginDescriptor<Shell>> {
    PluginDescriptor::builder(PLUGIN_ID)
        .description("Application command registry")
        .provides(&COMMANDS)
        .activate(|_shell, _deps| async { Ok(CommandRegistry::default()) })
        .build()
}
