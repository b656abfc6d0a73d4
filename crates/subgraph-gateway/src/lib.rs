#![allow(missing_docs)]

//! Subgraph Gateway - hosts several GraphQL subgraphs behind one listener.
//!
//! Every configured subgraph gets its own schema, its own query engine and its
//! own path (`/{name}/graphql`). Subgraphs that declare streaming support also
//! get a WebSocket transport on the same path, bridged to a cyclic event
//! producer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                         COMPOSITION ROUTER                                   │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │   descriptors ──► Schema Provider ──► (authored | mocked) dynamic schema     │
//! │                         │                                                    │
//! │            ┌────────────┴─────────────┐                                      │
//! │            ▼                          ▼                                      │
//! │   Streaming Transport Binder    Query Engine                                 │
//! │   GET  /{name}/graphql (ws)     POST /{name}/graphql                         │
//! │            │                          │                                      │
//! │            └────────────┬─────────────┘                                      │
//! │                         ▼                                                    │
//! │                  Shared Listener  (+ /health, /metrics)                      │
//! │                  CORS → Tracing → Timeout → Handler                          │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Lifecycle
//!
//! `Idle → Provisioning(i) → … → Listening → Draining → Stopped`. Any
//! provisioning failure is fatal and aborts before the port is bound. On
//! shutdown every streaming binder is disposed before the listener closes.
//!
//! # Usage
//!
//! ```ignore
//! use subgraph_gateway::{CompositionRouter, GatewayConfig, ProcessIdentity};
//!
//! let mut router = CompositionRouter::new(config, ProcessIdentity::new("pod-1"), descriptors)?;
//! let addr = router.start().await?;
//! // ...
//! router.shutdown().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod engine;
pub mod listener;
pub mod middleware;
pub mod schema;
pub mod service;
pub mod stream;
pub mod ws;

// Re-exports for public API
pub use domain::config::GatewayConfig;
pub use domain::descriptor::{validate_descriptors, ProcessIdentity, SchemaSource, SubgraphDescriptor};
pub use domain::error::{
    ConfigError, DrainTimeoutError, ExecutionError, GatewayError, SchemaBuildError,
    StreamConnectionError,
};
pub use engine::{EnginePhase, QueryEngine};
pub use listener::SharedListener;
pub use middleware::GatewayMetrics;
pub use schema::{
    ArgDef, FieldDef, ObjectDef, ProvidedSchema, Provenance, RequestContext, ResolveError, ResolveInput,
    SchemaDefinition, SchemaProvider, StreamFieldDef, TypeShape,
};
pub use service::{CompositionRouter, RouterState};
pub use stream::{DomainEvent, EventCatalog, EventCursor, EventStreamSource};
pub use ws::{StreamingBinding, StreamingTransportBinder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
