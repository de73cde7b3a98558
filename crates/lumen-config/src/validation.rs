//! Configuration validation module.
//!
//! Checks every section and reports all problems at once, failing fast on
//! invalid configuration rather than at bootstrap.

use crate::{AppConfig, PluginsConfig};
use lumen_core::telemetry::TelemetryConfig;
use regex::Regex;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// A plugin pattern is not a valid regular expression.
    InvalidPluginPattern {
        list: &'static str,
        pattern: String,
        message: String,
    },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Sampling ratio must be between 0.0 and 1.0.
    InvalidSamplingRatio { value: f64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Service name must not be empty.
    EmptyServiceName,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPluginPattern { list, pattern, message } => {
                write!(f, "Invalid {} plugin pattern '{}': {}", list, pattern, message)
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::InvalidSamplingRatio { value } => {
                write!(
                    f,
                    "Invalid sampling ratio: {} (must be between 0.0 and 1.0)",
                    value
                )
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: off, trace, debug, info, warn, error)",
                    value
                )
            }
            Self::EmptyServiceName => write!(f, "Observability service name cannot be empty"),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["off", "trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_plugins(&config.plugins, &mut errors);
        Self::validate_observability(&config.observability, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_plugins(config: &PluginsConfig, errors: &mut Vec<ConfigValidationError>) {
        let lists = [("deferred", &config.deferred), ("disabled", &config.disabled)];
        for (list, patterns) in lists {
            for pattern in patterns {
                if let Err(e) = Regex::new(pattern) {
                    errors.push(ConfigValidationError::InvalidPluginPattern {
                        list,
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    fn validate_observability(config: &TelemetryConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.service_name.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyServiceName);
        }

        // Directives look like `info` or `lumen_plugin_runtime=trace`. Only the
        // level after `=` is checked; a bare word may be a target.
        for directive in config.log_level.split(',').map(str::trim) {
            let Some((_, level)) = directive.rsplit_once('=') else {
                continue;
            };
            if !Self::VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                errors.push(ConfigValidationError::InvalidLogLevel {
                    value: directive.to_string(),
                });
            }
        }

        if !(0.0..=1.0).contains(&config.sampling_ratio) {
            errors.push(ConfigValidationError::InvalidSamplingRatio {
                value: config.sampling_ratio,
            });
        }

        if let Some(endpoint) = &config.otlp_endpoint {
            match Url::parse(endpoint) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                Ok(url) => errors.push(ConfigValidationError::InvalidUrl {
                    url_type: "OTLP".to_string(),
                    message: format!("unsupported scheme '{}'", url.scheme()),
                }),
                Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                    url_type: "OTLP".to_string(),
                    message: e.to_string(),
                }),
            }
        }
    }
}
