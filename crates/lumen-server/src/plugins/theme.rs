//! Theme manager plugin.

use super::{SETTINGS, THEMES, TRANSLATOR};
use crate::shell::Shell;
use lumen_plugin_api::{PluginDescriptor, PluginResult};
use parking_lot::RwLock;
use std::sync::Arc;

pub const PLUGIN_ID: &str = "@lumen/theme:plugin";

/// Translates user-facing strings. Nothing built in provides one.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str) -> String;
}

/// Known themes and the one in use.
#[derive(Debug)]
pub struct ThemeManager {
    themes: Vec<String>,
    current: RwLock<String>,
    /// Display label of the theme switcher, translated when a translator exists.
    label: String,
}

impl ThemeManager {
    pub fn new(themes: Vec<String>, current: String, label: String) -> Self {
        Self {
            themes,
            current: RwLock::new(current),
            label,
        }
    }

    pub fn themes(&self) -> &[String] {
        &self.themes
    }

    pub fn current(&self) -> String {
        self.current.read().clone()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Switches theme. Unknown names are refused.
    pub fn set_current(&self, theme: &str) -> bool {
        if !self.themes.iter().any(|t| t == theme) {
            return false;
        }
        *self.current.write() = theme.to_string();
        true
    }
}

pub fn plugin() -> PluginResult<PluginDescriptor<Shell>> {
    PluginDescriptor::builder(PLUGIN_ID)
        .description("Theme manager")
        .requires(&SETTINGS)
        .optional(&TRANSLATOR)
        .provides(&THEMES)
        .activate(|_shell, deps| {
            let settings = deps.required(&SETTINGS);
            let translator: Option<Arc<Box<dyn Translator>>> = deps.optional(&TRANSLATOR);
            async move {
                let settings = settings?;
                let themes = vec!["light".to_string(), "dark".to_string()];
                let current = settings
                    .get_str("theme")
                    .filter(|theme| themes.contains(theme))
                    .unwrap_or_else(|| themes[0].clone());

                let label = match &translator {
                    Some(translator) => translator.translate("Theme"),
                    None => {
                        tracing::debug!("No translator available, using untranslated labels");
                        "Theme".to_string()
                    }
                };

                Ok(ThemeManager::new(themes, current, label))
            }
        })
        .build()
}
