//! Error taxonomy for the subgraph gateway.
//!
//! Only [`ConfigError`] and [`SchemaBuildError`] are fatal; they surface as
//! [`GatewayError`] from startup. Request and connection failures stay local
//! to their caller.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration errors, rejected before anything is bound
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Two descriptors share a name (and therefore a path)
    #[error("duplicate subgraph name: {0}")]
    DuplicateSubgraph(String),
    /// Name is not usable as a single path segment
    #[error("invalid subgraph name {name:?}: {reason}")]
    InvalidSubgraphName { name: String, reason: &'static str },
    /// Nothing to host
    #[error("no subgraphs configured")]
    NoSubgraphs,
    /// An event stream was declared over an empty catalog
    #[error("event catalog for {0} is empty")]
    EmptyEventCatalog(String),
    /// Two handlers claimed the same path and method
    #[error("route conflict: {method} {path} is already mounted")]
    RouteConflict { path: String, method: String },
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Failure to produce a schema for one subgraph
#[derive(Debug, thiserror::Error)]
pub enum SchemaBuildError {
    /// The supplier reported an error
    #[error("schema supplier failed: {0}")]
    Supplier(String),
    /// The supplier panicked
    #[error("schema supplier panicked: {0}")]
    SupplierPanicked(String),
    /// The definition does not form a valid schema
    #[error("invalid schema: {0}")]
    Invalid(String),
    /// The definition carries an invalid configuration value
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Gateway-level errors returned from startup and shutdown
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Schema provisioning failed for a subgraph
    #[error("failed to build schema for subgraph {subgraph}: {source}")]
    SchemaBuild {
        subgraph: String,
        #[source]
        source: SchemaBuildError,
    },

    /// Shared listener could not be bound
    #[error("server bind error on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Operation not valid in the current router state
    #[error("invalid router state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: String,
    },

    /// Listener task failed
    #[error("server error: {0}")]
    Server(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-connection failure on a streaming transport
#[derive(Debug, thiserror::Error)]
pub enum StreamConnectionError {
    /// Socket write or read failed
    #[error("transport error: {0}")]
    Transport(String),
    /// Connection was dropped without a close handshake
    #[error("connection force-closed after {0:?}")]
    ForceClosed(Duration),
    /// Peer did not accept the close frame in time
    #[error("close frame not flushed within {0:?}")]
    CloseTimeout(Duration),
}

/// Streaming connections still open when the drain grace ran out
#[derive(Debug, Clone, thiserror::Error)]
#[error("{remaining} connection(s) on {subgraph} still open after {grace:?}")]
pub struct DrainTimeoutError {
    pub subgraph: String,
    pub remaining: usize,
    pub grace: Duration,
}

/// Error codes carried in `extensions.code`
pub mod codes {
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
    pub const TIMEOUT: &str = "GATEWAY_TIMEOUT";
}

/// Request failure that happens outside GraphQL execution.
///
/// Rendered with the same `{"errors": [...]}` envelope a GraphQL response
/// uses so clients need only one error path.
#[derive(Debug, Clone)]
pub struct ExecutionError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ExecutionError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Engine for the subgraph is not serving
    pub fn unavailable(subgraph: &str) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::SERVICE_UNAVAILABLE,
            format!("Subgraph {} is not accepting requests", subgraph),
        )
    }

    /// Request exceeded the engine timeout
    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            codes::TIMEOUT,
            format!("Request exceeded {}ms timeout", limit.as_millis()),
        )
    }

    pub fn body(&self) -> serde_json::Value {
        #[derive(Serialize)]
        struct Extensions<'a> {
            code: &'a str,
        }
        #[derive(Serialize)]
        struct Entry<'a> {
            message: &'a str,
            extensions: Extensions<'a>,
        }

        serde_json::json!({
            "errors": [Entry {
                message: &self.message,
                extensions: Extensions { code: self.code },
            }]
        })
    }
}

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ExecutionError {}

impl IntoResponse for ExecutionError {
    fn into_response(self) -> Response {
        let body = serde_json::to_vec(&self.body()).unwrap_or_default();
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
