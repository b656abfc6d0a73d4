//! Query Engine.
//!
//! Serves queries and mutations for one subgraph over `POST /{name}/graphql`,
//! and over `GET /{name}/graphql?query=…` unless the path's GET is taken by a
//! streaming transport. Each engine owns its schema; engines never share
//! state with each other.
//!
//! Lifecycle: `Constructed → Started → Draining → Stopped`. The route stays
//! mounted once started (the mount table is frozen), so a stopped engine
//! answers with a structured `503` instead of disappearing.

use crate::domain::error::{ExecutionError, GatewayError};
use crate::listener::SharedListener;
use crate::middleware::{GatewayMetrics, RequestTimer, TimeoutLayer};
use crate::schema::{ProvidedSchema, RequestContext};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Query engine lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Constructed,
    Started,
    Draining,
    Stopped,
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnginePhase::Constructed => "constructed",
            EnginePhase::Started => "started",
            EnginePhase::Draining => "draining",
            EnginePhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

struct EngineState {
    schema: ProvidedSchema,
    phase: RwLock<EnginePhase>,
    metrics: Arc<GatewayMetrics>,
}

/// Request handling for one subgraph schema
#[derive(Clone)]
pub struct QueryEngine {
    path: String,
    request_timeout: Duration,
    state: Arc<EngineState>,
}

impl QueryEngine {
    pub fn new(
        schema: ProvidedSchema,
        path: impl Into<String>,
        request_timeout: Duration,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            path: path.into(),
            request_timeout,
            state: Arc::new(EngineState {
                schema,
                phase: RwLock::new(EnginePhase::Constructed),
                metrics,
            }),
        }
    }

    pub fn subgraph(&self) -> &str {
        &self.state.schema.subgraph
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn phase(&self) -> EnginePhase {
        *self.state.phase.read()
    }

    /// Register the query route on the listener and start accepting requests.
    pub fn start(&self, listener: &mut SharedListener) -> Result<(), GatewayError> {
        let phase = self.phase();
        if phase != EnginePhase::Constructed {
            return Err(GatewayError::InvalidState {
                expected: "constructed",
                found: phase.to_string(),
            });
        }

        let handler = post(execute)
            .layer(TimeoutLayer::new(self.request_timeout))
            .with_state(Arc::clone(&self.state));
        listener.mount(&self.path, Method::POST, handler)?;

        // Streaming subgraphs are bound first and own GET for the upgrade
        let serves_get = !listener.is_mounted(&self.path, &Method::GET);
        if serves_get {
            let handler = get(execute)
                .layer(TimeoutLayer::new(self.request_timeout))
                .with_state(Arc::clone(&self.state));
            listener.mount(&self.path, Method::GET, handler)?;
        }

        *self.state.phase.write() = EnginePhase::Started;
        info!(
            subgraph = %self.subgraph(),
            path = %self.path,
            provenance = %self.state.schema.provenance,
            serves_get,
            "Query engine started"
        );
        Ok(())
    }

    /// Shutdown has begun; in-flight and new requests are still served.
    pub fn begin_drain(&self) {
        let mut phase = self.state.phase.write();
        if *phase == EnginePhase::Started {
            *phase = EnginePhase::Draining;
        }
    }

    /// Reject every further request.
    pub fn stop(&self) {
        let mut phase = self.state.phase.write();
        if *phase != EnginePhase::Stopped {
            *phase = EnginePhase::Stopped;
            debug!(subgraph = %self.state.schema.subgraph, "Query engine stopped");
        }
    }
}

async fn execute(
    State(state): State<Arc<EngineState>>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> Response {
    let phase = *state.phase.read();
    if matches!(phase, EnginePhase::Constructed | EnginePhase::Stopped) {
        state.metrics.record_rejection();
        return ExecutionError::unavailable(&state.schema.subgraph).into_response();
    }

    let timer = RequestTimer::new(Arc::clone(&state.metrics));
    let request = request.into_inner().data(RequestContext::new(headers));
    let response = state.schema.schema.execute(request).await;
    timer.finish(response.is_ok());

    GraphQLResponse::from(response).into_response()
}
