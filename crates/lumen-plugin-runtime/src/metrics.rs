//! Metrics for plugin registration and activation.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metric names for the plugin runtime.
pub mod names {
    /// Total plugins registered.
    pub const PLUGINS_REGISTERED_TOTAL: &str = "lumen_plugins_registered_total";
    /// Total plugins deregistered.
    pub const PLUGINS_DEREGISTERED_TOTAL: &str = "lumen_plugins_deregistered_total";
    /// Total successful activations.
    pub const PLUGINS_ACTIVATED_TOTAL: &str = "lumen_plugins_activated_total";
    /// Total failed activations.
    pub const PLUGINS_FAILED_TOTAL: &str = "lumen_plugins_failed_total";
    /// Plugins currently registered.
    pub const PLUGINS_REGISTERED: &str = "lumen_plugins_registered";
    /// Time from first poll of an activation to its terminal state.
    pub const ACTIVATION_DURATION_SECONDS: &str = "lumen_plugin_activation_duration_seconds";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::PLUGINS_REGISTERED_TOTAL, "Total number of plugins registered");
    describe_counter!(names::PLUGINS_DEREGISTERED_TOTAL, "Total number of plugins deregistered");
    describe_counter!(names::PLUGINS_ACTIVATED_TOTAL, "Total number of plugins activated");
    describe_counter!(
        names::PLUGINS_FAILED_TOTAL,
        "Total number of plugin activations that failed"
    );
    describe_gauge!(names::PLUGINS_REGISTERED, "Current number of registered plugins");
    describe_histogram!(
        names::ACTIVATION_DURATION_SECONDS,
        "Plugin activation duration in seconds, dependencies included"
    );
}

/// Plugin metrics recorder.
#[derive(Clone)]
pub struct PluginMetrics;

impl PluginMetrics {
    /// Record a registration.
    pub fn registered(plugin_id: &str, total: usize) {
        counter!(names::PLUGINS_REGISTERED_TOTAL, "plugin" => plugin_id.to_string()).increment(1);
        gauge!(names::PLUGINS_REGISTERED).set(total as f64);
    }

    /// Record a deregistration.
    pub fn deregistered(plugin_id: &str, total: usize) {
        counter!(names::PLUGINS_DEREGISTERED_TOTAL, "plugin" => plugin_id.to_string()).increment(1);
        gauge!(names::PLUGINS_REGISTERED).set(total as f64);
    }

    /// Record a successful activation.
    pub fn activated(plugin_id: &str, duration: Duration) {
        counter!(names::PLUGINS_ACTIVATED_TOTAL, "plugin" => plugin_id.to_string()).increment(1);

        histogram!(
            names::ACTIVATION_DURATION_SECONDS,
            "plugin" => plugin_id.to_string(),
            "status" => "activated"
        )
        .record(duration.as_secs_f64());
    }

    /// Record a failed activation.
    pub fn failed(plugin_id: &str, error_code: &'static str, duration: Duration) {
        counter!(
            names::PLUGINS_FAILED_TOTAL,
            "plugin" => plugin_id.to_string(),
            "error_code" => error_code
        )
        .increment(1);

        histogram!(
            names::ACTIVATION_DURATION_SECONDS,
            "plugin" => plugin_id.to_string(),
            "status" => "failed"
        )
        .record(duration.as_secs_f64());
    }
}
