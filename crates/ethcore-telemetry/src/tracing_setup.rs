//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{TelemetryConfig, TelemetryError};

/// Guard returned by [`init_tracing`]. Dropping it is a no-op; it exists so
/// callers have a value to hold for the lifetime of the process, matching
/// the shape of process-wide init guards elsewhere in the workspace.
pub struct TracingGuard;

/// Initialize the global `tracing` subscriber for the process.
///
/// Safe to call once per process; a second call returns an error rather
/// than panicking, since `set_global_default` can only succeed once.
pub fn init_tracing(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Config(e.to_string()))?;

    let result = if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(config.console_output);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    result.map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    tracing::info!(service = %config.service_name, "tracing initialized");
    Ok(TracingGuard)
}
