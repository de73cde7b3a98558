//! Status bar plugin.

use super::{COMMANDS, THEMES};
use crate::shell::{Area, Shell, Widget};
use lumen_plugin_api::{AutoStart, PluginDescriptor, PluginResult};
use std::sync::Arc;

pub const PLUGIN_ID: &str = "@lumen/status-bar:plugin";
pub const TOGGLE_COMMAND: &str = "status-bar:toggle";

pub fn plugin() -> PluginResult<PluginDescriptor<Shell>> {
    PluginDescriptor::builder(PLUGIN_ID)
        .description("Status bar with the active theme")
        .requires(&COMMANDS)
        .optional(&THEMES)
        .auto_start(AutoStart::Always)
        .activate(|shell: Arc<Shell>, deps| {
            let commands = deps.required(&COMMANDS);
            let themes = deps.optional(&THEMES);
            async move {
                let commands = commands?;
                commands.add(TOGGLE_COMMAND, "Toggle Status Bar");

                let label = match themes {
                    Some(themes) => format!("{}: {}", themes.label(), themes.current()),
                    None => shell.name().to_string(),
                };
                shell.add(
                    Area::Status,
                    Widget {
                        id: "status-bar:theme".to_string(),
                        label,
                        rank: 100,
                    },
                );
                Ok(())
            }
        })
        .build()
}
