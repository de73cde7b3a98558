//! Logging and tracing bootstrap.
//!
//! Installs a `tracing-subscriber` registry with an environment filter and a
//! text or JSON formatter. With the `otlp` feature enabled, spans are also
//! exported to an OpenTelemetry collector.

use crate::{LumenError, LumenResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directives when neither `RUST_LOG` nor configuration set one.
pub const DEFAULT_LOG_FILTER: &str = "info,lumen=debug";

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name reported to the collector.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Filter directives in `EnvFilter` syntax, e.g. `"info,lumen_plugin_runtime=trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,

    /// OTLP endpoint URL (e.g., "http://localhost:4317"). Only used with the `otlp` feature.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Sampling ratio (0.0 to 1.0).
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_service_name() -> String {
    "lumen".to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            json_logs: false,
            otlp_endpoint: None,
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

/// Builds the event filter. `RUST_LOG` wins over the configured directives.
pub fn build_filter(config: &TelemetryConfig) -> LumenResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.log_level).map_err(|e| {
        LumenError::Telemetry(format!("Invalid log filter '{}': {}", config.log_level, e))
    })
}

/// Initialize logging (and, with the `otlp` feature, span export).
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> LumenResult<()> {
    let filter = build_filter(config)?;

    let text_layer = (!config.json_logs).then(|| fmt::layer().with_target(true));
    let json_layer = config.json_logs.then(|| fmt::layer().json().with_target(true));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer);

    #[cfg(feature = "otlp")]
    let registry = registry.with(otlp::layer(config)?);

    registry
        .try_init()
        .map_err(|e| LumenError::Telemetry(e.to_string()))?;

    tracing::info!(
        service_name = %config.service_name,
        json_logs = config.json_logs,
        otlp_endpoint = ?config.otlp_endpoint,
        "Telemetry initialized"
    );

    Ok(())
}

/// Shutdown telemetry, flushing any pending spans.
#[cfg(feature = "otlp")]
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
    tracing::info!("Telemetry shutdown complete");
}

/// No spans to flush without the `otlp` feature.
#[cfg(not(feature = "otlp"))]
pub fn shutdown_telemetry() {}

#[cfg(feature = "otlp")]
mod otlp {
    use super::TelemetryConfig;
    use crate::{LumenError, LumenResult};
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{
        runtime,
        trace::{RandomIdGenerator, Sampler, Tracer, TracerProvider},
        Resource,
    };
    use opentelemetry_semantic_conventions::resource::SERVICE_NAME;
    use tracing::Subscriber;
    use tracing_opentelemetry::OpenTelemetryLayer;
    use tracing_subscriber::registry::LookupSpan;

    /// Builds the OpenTelemetry layer, or `None` when no endpoint is configured.
    pub(super) fn layer<S>(config: &TelemetryConfig) -> LumenResult<Option<OpenTelemetryLayer<S, Tracer>>>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let Some(endpoint) = &config.otlp_endpoint else {
            return Ok(None);
        };

        let sampler = if config.sampling_ratio >= 1.0 {
            Sampler::AlwaysOn
        } else if config.sampling_ratio <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(config.sampling_ratio)
        };

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| LumenError::Telemetry(format!("Failed to create OTLP exporter: {}", e)))?;

        let provider = TracerProvider::builder()
            .with_batch_exporter(exporter, runtime::Tokio)
            .with_sampler(sampler)
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(Resource::new(vec![KeyValue::new(
                SERVICE_NAME,
                config.service_name.clone(),
            )]))
            .build();

        let tracer = provider.tracer("lumen");
        opentelemetry::global::set_tracer_provider(provider);

        Ok(Some(tracing_opentelemetry::layer().with_tracer(tracer)))
    }
}
