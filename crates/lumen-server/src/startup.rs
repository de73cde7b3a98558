//! Startup logging.

use crate::app::StartupSummary;
use crate::shell::Shell;
use tracing::{info, warn};

/// Prints the startup banner.
pub fn print_banner(shell: &Shell) {
    info!(
        r#"
    __
   / /   __  ______ ___  ___  ____
  / /   / / / / __ `__ \/ _ \/ __ \
 / /___/ /_/ / / / / / /  __/ / / /
/_____/\__,_/_/ /_/ /_/\___/_/ /_/
    "#
    );
    info!("{} v{}", shell.name(), shell.version());
}

/// Logs what the bootstrap did, one line per failure.
pub fn print_startup_info(summary: &StartupSummary) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Registered: {}", summary.registered.len());
    info!("Excluded:   {}", summary.excluded.len());
    info!("Activation: {}", summary.report);
    info!("Elapsed:    {:?}", summary.elapsed);

    for error in &summary.rejected {
        warn!(error = %error, "Rejected at registration");
    }

    for failure in &summary.report.failed {
        warn!(
            plugin_id = %failure.id,
            code = failure.error.error_code(),
            root_cause = %failure.error.root_cause(),
            "Plugin failed to activate"
        );
    }
    info!("{}", separator);
}
