//! Logging configuration from environment variables.

use std::env;

/// Configuration for the node's structured logging.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line.
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error), or an `EnvFilter` directive string.
    pub log_level: String,

    /// Whether to enable ANSI-colored console output (disabled for containers).
    pub console_output: bool,

    /// Whether to emit JSON-formatted logs instead of human-readable ones.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "ethcore".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Build configuration from environment variables.
    ///
    /// - `RUST_LOG` or `ETHCORE_LOG`: log level / filter directive (default: info)
    /// - `ETHCORE_JSON_LOGS`: emit JSON logs (default: false)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("ETHCORE_SERVICE_NAME").unwrap_or_else(|_| "ethcore".into()),
            log_level: env::var("ETHCORE_LOG")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".into()),
            console_output: env::var("ETHCORE_CONSOLE")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
            json_logs: env::var("ETHCORE_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "ethcore");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }
}
