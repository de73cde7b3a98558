//! Application bootstrap.

use crate::plugins::builtin_plugins;
use crate::shell::Shell;
use lumen_config::AppConfig;
use lumen_core::LumenResult;
use lumen_plugin_api::{PluginDescriptor, PluginError, PluginId};
use lumen_plugin_runtime::{ActivationReport, PatternFilter, PluginRegistry, RegistryDiagnostics};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What happened during bootstrap.
#[derive(Debug, Default)]
pub struct StartupSummary {
    /// Plugins registered, in registration order.
    pub registered: Vec<PluginId>,
    /// Plugins left out because configuration disables them.
    pub excluded: Vec<PluginId>,
    /// Registration errors (duplicate ids or providers).
    pub rejected: Vec<PluginError>,
    /// Static analysis of the registered graph.
    pub diagnostics: RegistryDiagnostics,
    /// Combined outcome of the eager and deferred passes.
    pub report: ActivationReport,
    pub elapsed: Duration,
}

impl StartupSummary {
    /// True when every registered plugin that was asked to start did.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.report.is_success()
    }
}

/// The shell, its plugin registry, and the configuration they run under.
pub struct Application {
    shell: Arc<Shell>,
    registry: PluginRegistry<Shell>,
    filter: PatternFilter,
    config: AppConfig,
}

impl Application {
    /// Creates the application. Fails if the plugin patterns do not compile.
    pub fn new(config: AppConfig) -> LumenResult<Self> {
        let shell = Arc::new(Shell::new(config.app.name.clone(), config.app.version.clone()));
        let filter = PatternFilter::from_config(&config.plugins)?;

        Ok(Self {
            registry: PluginRegistry::new(Arc::clone(&shell)),
            shell,
            filter,
            config,
        })
    }

    /// Creates the application and bootstraps the built-in plugins.
    pub async fn start(config: AppConfig) -> LumenResult<(Self, StartupSummary)> {
        let app = Self::new(config)?;
        let plugins = if app.config.plugins.enabled {
            builtin_plugins()?
        } else {
            info!("Built-in plugins are disabled");
            Vec::new()
        };

        let summary = app.bootstrap(plugins).await;
        Ok((app, summary))
    }

    pub fn shell(&self) -> &Arc<Shell> {
        &self.shell
    }

    pub fn registry(&self) -> &PluginRegistry<Shell> {
        &self.registry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registers `plugins` and runs the activation passes.
    ///
    /// Plugin failures are logged and collected in the summary; bootstrap
    /// itself does not fail.
    pub async fn bootstrap(&self, plugins: Vec<PluginDescriptor<Shell>>) -> StartupSummary {
        let started = Instant::now();
        let mut summary = StartupSummary::default();

        for descriptor in plugins {
            let id = descriptor.id().clone();
            if self.filter.is_disabled(&id) {
                info!(plugin_id = %id, "Plugin disabled by configuration");
                summary.excluded.push(id);
                continue;
            }

            match self.registry.register(descriptor) {
                Ok(()) => summary.registered.push(id),
                Err(e) => {
                    warn!(plugin_id = %id, error = %e, "Plugin registration rejected");
                    summary.rejected.push(e);
                }
            }
        }

        summary.diagnostics = self.registry.diagnose();
        log_diagnostics(&summary.diagnostics);

        let plugins = &self.config.plugins;
        summary.report = self
            .registry
            .activate_all_with(plugins.auto_start_only, &self.filter)
            .await;

        if plugins.activate_deferred {
            let later = self.registry.activate_deferred().await;
            summary
                .report
                .deferred
                .retain(|id| !later.activated.contains(id) && later.failure(id).is_none());
            summary.report.merge(later);
        } else if !summary.report.deferred.is_empty() {
            debug!(count = summary.report.deferred.len(), "Deferred plugins left pending");
        }

        summary.elapsed = started.elapsed();
        summary
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("shell", &self.shell.name())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn log_diagnostics(diagnostics: &RegistryDiagnostics) {
    for missing in &diagnostics.missing {
        warn!(
            plugin_id = %missing.plugin,
            token = %missing.token,
            "Required token has no provider"
        );
    }

    for cycle in &diagnostics.cycles {
        let members: Vec<&str> = cycle.iter().map(PluginId::as_str).collect();
        warn!(plugins = ?members, "Plugins depend on each other");
    }

    for (plugin, token) in &diagnostics.unavailable_optional {
        debug!(plugin_id = %plugin, token = %token, "Optional token has no provider");
    }

    debug!(order = ?diagnostics.activation_order, "Planned activation order");
}
