//! # Lumen
//!
//! Loads configuration, installs logging, and bootstraps the application
//! shell with its built-in plugins.
//!
//! Plugin failures are reported and the shell keeps running without the
//! affected plugins. The process exits non-zero only when configuration or
//! logging cannot be set up.

use lumen_config::ConfigLoader;
use lumen_core::telemetry::{init_telemetry, shutdown_telemetry};
use lumen_core::LumenResult;
use lumen_plugin_runtime::metrics::register_metrics;
use lumen_server::startup::{print_banner, print_startup_info};
use lumen_server::Application;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Logging may not be installed yet.
        eprintln!("lumen: {}", e);
        error!(code = e.error_code(), "Startup failed: {}", e);
        shutdown_telemetry();
        std::process::exit(e.exit_code());
    }
}

async fn run() -> LumenResult<()> {
    let loader = ConfigLoader::from_default_location()?;
    let config = loader.get().await;

    init_telemetry(&config.observability)?;
    register_metrics();

    info!(
        environment = %config.app.environment,
        config_dir = %loader.config_dir().display(),
        "Configuration loaded"
    );

    let (app, summary) = Application::start(config).await?;
    print_banner(app.shell());
    print_startup_info(&summary);

    info!(
        plugins = app.registry().len(),
        widgets = app.shell().widget_count(),
        "Shell ready"
    );

    shutdown_telemetry();
    Ok(())
}
