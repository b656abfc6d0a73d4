//! Domain types for the subgraph gateway.
//!
//! Configuration, subgraph descriptors, connection identifiers and the error
//! taxonomy. Nothing in here touches the network.

pub mod config;
pub mod correlation;
pub mod descriptor;
pub mod error;

// Re-exports for convenience
pub use config::{
    CorsConfig, EngineConfig, GatewayConfig, HttpConfig, ShutdownConfig, StreamingConfig,
};
pub use correlation::ConnectionId;
pub use descriptor::{
    validate_descriptors, ProcessIdentity, SchemaSource, SchemaSupplier, SubgraphDescriptor,
};
pub use error::{
    ConfigError, DrainTimeoutError, ExecutionError, GatewayError, SchemaBuildError,
    StreamConnectionError,
};
