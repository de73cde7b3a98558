//! Application configuration structures.

use lumen_core::telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Plugin bootstrap configuration.
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub observability: TelemetryConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "lumen".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Plugin bootstrap configuration.
///
/// `deferred` and `disabled` hold regular expressions matched against plugin
/// ids. A pattern matches when it finds a match anywhere in the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Register the built-in plugins at all.
    pub enabled: bool,
    /// Only eagerly activate plugins marked auto-start.
    pub auto_start_only: bool,
    /// Run the deferred phase right after bootstrap.
    pub activate_deferred: bool,
    /// Patterns for plugins held back until the deferred phase.
    pub deferred: Vec<String>,
    /// Patterns for plugins that are not registered.
    pub disabled: Vec<String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_start_only: true,
            activate_deferred: true,
            deferred: Vec::new(),
            disabled: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Returns true when running in the production environment.
    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }
}
