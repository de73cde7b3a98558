//! Help plugin, activated in the deferred phase.

use super::COMMANDS;
use crate::shell::{Area, Shell, Widget};
use lumen_plugin_api::{AutoStart, PluginDescriptor, PluginResult};
use std::sync::Arc;

pub const PLUGIN_ID: &str = "@lumen/help:about";
pub const ABOUT_COMMAND: &str = "help:about";

pub fn plugin() -> PluginResult<PluginDescriptor<Shell>> {
    PluginDescriptor::builder(PLUGIN_ID)
        .description("About dialog and help menu")
        .requires(&COMMANDS)
        .auto_start(AutoStart::Defer)
        .activate(|shell: Arc<Shell>, deps| {
            let commands = deps.required(&COMMANDS);
            async move {
                let commands = commands?;
                commands.add(ABOUT_COMMAND, format!("About {}", shell.name()));
                shell.add(
                    Area::Top,
                    Widget {
                        id: "help:menu".to_string(),
                        label: "Help".to_string(),
                        rank: 1000,
                    },
                );
                Ok(())
            }
        })
        .build()
}
