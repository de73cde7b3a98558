//! Plugins that ship with the shell.
//!
//! The theme manager lists a translator as optional and nothing here
//! provides one, so it always activates without it.

pub mod commands;
pub mod help;
pub mod settings;
pub mod status_bar;
pub mod theme;

pub use commands::{Command, CommandRegistry};
pub use settings::SettingRegistry;
pub use theme::{ThemeManager, Translator};

use crate::shell::Shell;
use lumen_plugin_api::{PluginDescriptor, PluginResult, Token};
use once_cell::sync::Lazy;

pub static SETTINGS: Lazy<Token<SettingRegistry>> =
    Lazy::new(|| Token::new("@lumen/settings:ISettingRegistry"));

pub static COMMANDS: Lazy<Token<CommandRegistry>> =
    Lazy::new(|| Token::new("@lumen/commands:ICommandRegistry"));

pub static THEMES: Lazy<Token<ThemeManager>> = Lazy::new(|| Token::new("@lumen/theme:IThemeManager"));

pub static TRANSLATOR: Lazy<Token<Box<dyn Translator>>> =
    Lazy::new(|| Token::new("@lumen/translation:ITranslator"));

/// Descriptors of every built-in plugin, in registration order.
pub fn builtin_plugins() -> PluginResult<Vec<PluginDescriptor<Shell>>> {
    Ok(vec![
        settings::plugin()?,
        commands::plugin()?,
        theme::plugin()?,
        status_bar::plugin()?,
        help::plugin()?,
    ])
}
