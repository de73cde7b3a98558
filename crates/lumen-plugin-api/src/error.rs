//! Plugin error taxonomy.

use lumen_core::{LumenError, PluginId};
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors raised while registering, activating, or resolving plugins.
///
/// The type is `Clone` because a failed activation is cached and handed to
/// every caller that asks for the plugin afterwards.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// A plugin with this id is already registered.
    #[error("Plugin '{id}' is already registered")]
    DuplicateId { id: PluginId },

    /// Another plugin already provides this token.
    #[error("Token '{token}' is already provided by '{existing}', rejecting '{rejected}'")]
    DuplicateProvider {
        token: String,
        existing: PluginId,
        rejected: PluginId,
    },

    /// No plugin with this id is registered.
    #[error("Unknown plugin '{id}'")]
    UnknownPlugin { id: PluginId },

    /// A required token has no registered provider.
    #[error("No provider for token '{token}'")]
    NoProvider { token: String },

    /// The dependency chain revisits a plugin that is already being activated.
    #[error("Cyclic plugin dependency: {}", join_cycle(.cycle))]
    CyclicDependency { cycle: Vec<PluginId> },

    /// A transitive dependency failed to activate.
    #[error("Plugin '{plugin}' cannot activate: dependency '{dependency}' failed")]
    DependencyFailed {
        plugin: PluginId,
        dependency: String,
        #[source]
        cause: Box<PluginError>,
    },

    /// The plugin's own activation function failed.
    #[error("Plugin '{plugin}' failed to activate: {cause}")]
    Activation {
        plugin: PluginId,
        #[source]
        cause: Arc<dyn StdError + Send + Sync>,
    },

    /// The descriptor is malformed.
    #[error("Invalid plugin descriptor '{id}': {reason}")]
    InvalidDescriptor { id: PluginId, reason: String },

    /// The plugin is activated or activating and cannot be removed without force.
    #[error("Plugin '{id}' is activated; deregistering it requires force")]
    StillActivated { id: PluginId },
}

fn join_cycle(cycle: &[PluginId]) -> String {
    cycle
        .iter()
        .map(PluginId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl PluginError {
    /// Wraps an error returned by an activation function.
    #[must_use]
    pub fn activation(plugin: PluginId, cause: anyhow::Error) -> Self {
        let cause: Box<dyn StdError + Send + Sync> = cause.into();
        Self::Activation {
            plugin,
            cause: Arc::from(cause),
        }
    }

    /// Wraps the failure of `dependency` on behalf of `plugin`.
    #[must_use]
    pub fn dependency_failed(plugin: PluginId, dependency: impl Into<String>, cause: PluginError) -> Self {
        Self::DependencyFailed {
            plugin,
            dependency: dependency.into(),
            cause: Box::new(cause),
        }
    }

    /// Returns the innermost error, looking through `DependencyFailed` wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &PluginError {
        let mut current = self;
        while let Self::DependencyFailed { cause, .. } = current {
            current = cause.as_ref();
        }
        current
    }

    /// Returns true if this error, or its root cause, is a dependency cycle.
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self.root_cause(), Self::CyclicDependency { .. })
    }

    /// Returns the plugin this error is about, if there is one.
    #[must_use]
    pub fn plugin_id(&self) -> Option<&PluginId> {
        match self {
            Self::DuplicateId { id }
            | Self::UnknownPlugin { id }
            | Self::InvalidDescriptor { id, .. }
            | Self::StillActivated { id } => Some(id),
            Self::DuplicateProvider { rejected, .. } => Some(rejected),
            Self::DependencyFailed { plugin, .. } | Self::Activation { plugin, .. } => Some(plugin),
            Self::CyclicDependency { cycle } => cycle.first(),
            Self::NoProvider { .. } => None,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "DUPLICATE_PLUGIN_ID",
            Self::DuplicateProvider { .. } => "DUPLICATE_PROVIDER",
            Self::UnknownPlugin { .. } => "UNKNOWN_PLUGIN",
            Self::NoProvider { .. } => "NO_PROVIDER",
            Self::CyclicDependency { .. } => "CYCLIC_DEPENDENCY",
            Self::DependencyFailed { .. } => "DEPENDENCY_FAILED",
            Self::Activation { .. } => "ACTIVATION_FAILED",
            Self::InvalidDescriptor { .. } => "INVALID_DESCRIPTOR",
            Self::StillActivated { .. } => "PLUGIN_STILL_ACTIVATED",
        }
    }
}

impl From<PluginError> for LumenError {
    fn from(err: PluginError) -> Self {
        match err {
            PluginError::UnknownPlugin { id } => Self::PluginNotFound(id.0),
            other => Self::Plugin {
                plugin_id: other
                    .plugin_id()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
                code: other.error_code(),
                message: other.to_string(),
            },
        }
    }
}
