//! # subgraph-host
//!
//! Serves the `products`, `reviews` and `users` subgraphs on one port.
//! See [`host_runtime::config`] for the environment variables it reads.

use anyhow::{Context, Result};
use host_runtime::{build_router, shutdown_signal, HostConfig};
use subgraph_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .context("Failed to initialize telemetry")?;

    let config = HostConfig::from_env().context("Invalid host configuration")?;
    info!(
        host = %config.hostname,
        addr = %config.gateway.http_addr(),
        mocks = ?config.mocks,
        "Starting subgraph host"
    );

    let router = build_router(&config).context("Failed to assemble subgraphs")?;
    router
        .run_until(shutdown_signal())
        .await
        .context("Subgraph host terminated with an error")?;

    Ok(())
}
