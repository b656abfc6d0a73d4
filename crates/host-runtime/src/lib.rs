//! # Subgraph Host Runtime
//!
//! Wires the catalog subgraphs into a [`CompositionRouter`] and drives it
//! from process signals.
//!
//! ## Startup Sequence
//!
//! 1. Install structured logging
//! 2. Load [`HostConfig`] from the environment
//! 3. Select authored or mocked schemas per subgraph
//! 4. Provision every subgraph, then bind the shared listener
//! 5. Serve until SIGTERM or Ctrl+C, then drain and exit

pub mod config;

pub use config::{HostConfig, HostConfigError};

use subgraph_catalog::local_subgraphs_with_mocks;
use subgraph_gateway::{CompositionRouter, GatewayError};
use tracing::{error, info};

/// Build the router for the catalog subgraphs described by `config`.
pub fn build_router(config: &HostConfig) -> Result<CompositionRouter, GatewayError> {
    let descriptors = local_subgraphs_with_mocks(&config.mocks);
    CompositionRouter::new(config.gateway.clone(), config.identity(), descriptors)
}

/// Resolve on the first SIGTERM or Ctrl+C.
///
/// A signal handler that cannot be installed is logged and never fires, so
/// the other one still stops the process.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received"),
        _ = terminate => info!("SIGTERM received"),
    }
}
