//! Structured logging for the node.
//!
//! A thin wrapper around `tracing`/`tracing-subscriber`: one call to install
//! a process-wide subscriber, plus macros for attaching consistent fields
//! (`subsystem`, `block_height`/`block_hash`, `tx_hash`) to log events at
//! block, transaction, and call-frame boundaries.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ethcore_telemetry::{TelemetryConfig, init_tracing};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_tracing(&config).expect("failed to init tracing");
//!
//!     // Your application code here
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ETHCORE_SERVICE_NAME` | `ethcore` | Service name attached to every log line |
//! | `ETHCORE_LOG` / `RUST_LOG` | `info` | Log level / `EnvFilter` directive |
//! | `ETHCORE_CONSOLE` | `true` | Enable ANSI-colored console output |
//! | `ETHCORE_JSON_LOGS` | `false` (`true` under Kubernetes/Docker) | Emit JSON logs |

#![warn(missing_docs)]
#![allow(missing_docs)] // TODO: Add documentation for all public items

mod config;
mod logging;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{init_tracing, TracingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
