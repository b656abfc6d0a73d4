//! Shared listener and its mount table.
//!
//! All subgraphs share one port. Routes are registered while the router is
//! provisioning (sequentially, through `&mut self`) and frozen into an axum
//! [`Router`] before the socket is bound, so the table is read-only while
//! serving.

use crate::domain::config::CorsConfig;
use crate::domain::descriptor::ProcessIdentity;
use crate::domain::error::{ConfigError, GatewayError};
use crate::middleware::{create_cors_layer, GatewayMetrics, TracingLayer};
use axum::extract::State;
use axum::http::Method;
use axum::response::IntoResponse;
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::debug;

/// Liveness endpoint
pub const HEALTH_PATH: &str = "/health";
/// JSON metrics endpoint
pub const METRICS_PATH: &str = "/metrics";

/// Mount table for the single network listener
pub struct SharedListener {
    addr: SocketAddr,
    routes: BTreeMap<String, MethodRouter>,
    mounted: BTreeSet<(String, String)>,
}

impl SharedListener {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            routes: BTreeMap::new(),
            mounted: BTreeSet::new(),
        }
    }

    /// Configured bind address (port 0 means ephemeral)
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register `handler` for `method` requests on `path`.
    ///
    /// Several methods may share a path; the same method twice on one path,
    /// or any handler on a built-in path, is a [`ConfigError::RouteConflict`].
    pub fn mount(
        &mut self,
        path: &str,
        method: Method,
        handler: MethodRouter,
    ) -> Result<(), ConfigError> {
        let key = (path.to_string(), method.to_string());
        if path == HEALTH_PATH || path == METRICS_PATH || self.mounted.contains(&key) {
            return Err(ConfigError::RouteConflict {
                path: path.to_string(),
                method: method.to_string(),
            });
        }
        self.mounted.insert(key);

        let merged = match self.routes.remove(path) {
            Some(existing) => existing.merge(handler),
            None => handler,
        };
        self.routes.insert(path.to_string(), merged);

        debug!(path = %path, method = %method, "Route mounted");
        Ok(())
    }

    /// Whether anything is mounted for `method` on `path`
    pub fn is_mounted(&self, path: &str, method: &Method) -> bool {
        self.mounted
            .contains(&(path.to_string(), method.to_string()))
    }

    /// Mounted paths in lexical order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Freeze the mount table into the application router.
    pub fn into_router(
        self,
        cors: &CorsConfig,
        identity: ProcessIdentity,
        metrics: Arc<GatewayMetrics>,
    ) -> Router {
        let mut router = Router::new();
        for (path, handler) in self.routes {
            router = router.route(&path, handler);
        }

        let ops = Router::new()
            .route(HEALTH_PATH, get(health_check))
            .route(METRICS_PATH, get(metrics_snapshot))
            .with_state(OpsState { identity, metrics });

        let middleware = ServiceBuilder::new()
            .layer(create_cors_layer(cors))
            .layer(TracingLayer::new());

        router.merge(ops).layer(middleware)
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, GatewayError> {
        TcpListener::bind(self.addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: self.addr,
                source,
            })
    }
}

#[derive(Clone)]
struct OpsState {
    identity: ProcessIdentity,
    metrics: Arc<GatewayMetrics>,
}

/// Health check endpoint
async fn health_check(State(state): State<OpsState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "host": state.identity.hostname(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_snapshot(State(state): State<OpsState>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}
