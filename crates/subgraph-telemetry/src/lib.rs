//! # Subgraph Telemetry
//!
//! Structured logging for the subgraph host.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use subgraph_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("Failed to init telemetry");
//!     // ...
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SUBGRAPH_SERVICE_NAME` | `subgraph-host` | Service name in logs |
//! | `SUBGRAPH_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `SUBGRAPH_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `SUBGRAPH_JSON_LOGS` | `true` in containers | JSON instead of pretty output |

mod config;
mod logging;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::{build_subscriber, BoxedSubscriber};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install global subscriber: {0}")]
    SubscriberInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install the global subscriber.
///
/// Returns a guard that should be held for the lifetime of the application.
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let subscriber = build_subscriber(&config, std::io::stdout)?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl TelemetryGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_service_name() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "subgraph-host");
    }
}
