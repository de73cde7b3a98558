//! Unified error type for the Lumen application shell.

use thiserror::Error;

/// Unified error type for Lumen.
///
/// Plugin-level failures carry their own taxonomy in `lumen-plugin-api`;
/// they are folded into [`LumenError::Plugin`] when they reach application
/// code that only needs a message and a code.
#[derive(Error, Debug)]
pub enum LumenError {
    // ============ Configuration Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Plugin Errors ============
    /// Plugin error
    #[error("Plugin error: {plugin_id} - {message}")]
    Plugin {
        plugin_id: String,
        code: &'static str,
        message: String,
    },

    /// Plugin not found
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    // ============ Runtime Errors ============
    /// Logging or tracing could not be installed
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LumenError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Plugin { code, .. } => *code,
            Self::PluginNotFound(_) => "PLUGIN_NOT_FOUND",
            Self::Telemetry(_) => "TELEMETRY_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the process exit code to use when this error ends the program.
    ///
    /// Codes follow `sysexits.h`.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 78,
            Self::Io(_) => 74,
            Self::Plugin { .. } | Self::PluginNotFound(_) => 69,
            Self::Telemetry(_) | Self::Internal(_) | Self::Other(_) => 70,
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error came from the plugin system.
    #[must_use]
    pub const fn is_plugin_error(&self) -> bool {
        matches!(self, Self::Plugin { .. } | Self::PluginNotFound(_))
    }
}

impl From<serde_json::Error> for LumenError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}
