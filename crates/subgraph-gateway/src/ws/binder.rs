//! Streaming Transport Binder.
//!
//! Mounts a WebSocket upgrade route for one streaming subgraph on the shared
//! listener and keeps track of every session it accepts so the whole set can
//! be drained on shutdown.

use super::connection::{ConnectionScope, StreamConnection};
use crate::domain::config::StreamingConfig;
use crate::domain::correlation::ConnectionId;
use crate::domain::descriptor::ProcessIdentity;
use crate::domain::error::{ConfigError, DrainTimeoutError, ExecutionError, StreamConnectionError};
use crate::listener::SharedListener;
use crate::middleware::GatewayMetrics;
use crate::schema::{ProvidedSchema, RequestContext};
use async_graphql::dynamic::Schema;
use async_graphql_axum::GraphQLProtocol;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use dashmap::DashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Attaches WebSocket transports to the shared listener
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingTransportBinder;

impl StreamingTransportBinder {
    pub fn new() -> Self {
        Self
    }

    /// Mount the upgrade route for `schema` at `path`.
    ///
    /// Must run before the listener is bound; routes are fixed afterwards.
    pub fn bind(
        &self,
        listener: &mut SharedListener,
        path: &str,
        schema: &ProvidedSchema,
        config: &StreamingConfig,
        metrics: Arc<GatewayMetrics>,
        identity: ProcessIdentity,
    ) -> Result<StreamingBinding, ConfigError> {
        let state = Arc::new(BindingState {
            subgraph: schema.subgraph.clone(),
            path: path.to_string(),
            schema: schema.schema.clone(),
            config: config.clone(),
            metrics,
            identity,
            accepting: AtomicBool::new(true),
            token: CancellationToken::new(),
            force: CancellationToken::new(),
            tracker: TaskTracker::new(),
            active: DashSet::new(),
        });

        listener.mount(path, Method::GET, get(upgrade).with_state(Arc::clone(&state)))?;

        info!(
            subgraph = %state.subgraph,
            path = %state.path,
            fields = ?schema.stream_fields,
            "Streaming transport bound"
        );

        Ok(StreamingBinding { state })
    }
}

struct BindingState {
    subgraph: String,
    path: String,
    schema: Schema,
    config: StreamingConfig,
    metrics: Arc<GatewayMetrics>,
    identity: ProcessIdentity,
    accepting: AtomicBool,
    /// Parent of every connection token
    token: CancellationToken,
    /// Drops sockets without a close handshake
    force: CancellationToken,
    tracker: TaskTracker,
    active: DashSet<ConnectionId>,
}

/// Handle to a mounted streaming transport
#[derive(Clone)]
pub struct StreamingBinding {
    state: Arc<BindingState>,
}

impl StreamingBinding {
    pub fn subgraph(&self) -> &str {
        &self.state.subgraph
    }

    pub fn path(&self) -> &str {
        &self.state.path
    }

    pub fn is_accepting(&self) -> bool {
        self.state.accepting.load(Ordering::SeqCst)
    }

    /// Sessions that have been accepted and not yet finished
    pub fn active_connections(&self) -> usize {
        self.state.active.len()
    }

    /// Stop accepting upgrades, cancel every live session, and wait up to
    /// `grace` for all of them to close.
    ///
    /// Idempotent. On timeout the sessions are left running; ending them is
    /// [`force_close`](Self::force_close)'s job.
    pub async fn dispose(&self, grace: Duration) -> Result<(), DrainTimeoutError> {
        let state = &self.state;
        state.accepting.store(false, Ordering::SeqCst);
        state.token.cancel();
        state.tracker.close();

        info!(
            subgraph = %state.subgraph,
            active = state.active.len(),
            grace_ms = grace.as_millis() as u64,
            "Draining streaming connections"
        );

        match tokio::time::timeout(grace, state.tracker.wait()).await {
            Ok(()) => {
                info!(subgraph = %state.subgraph, "Streaming transport drained");
                Ok(())
            }
            Err(_) => {
                let err = DrainTimeoutError {
                    subgraph: state.subgraph.clone(),
                    remaining: state.tracker.len().max(state.active.len()),
                    grace,
                };
                warn!(subgraph = %state.subgraph, error = %err, "Drain timed out");
                Err(err)
            }
        }
    }

    /// Drop every remaining session without a close handshake.
    pub fn force_close(&self) {
        let remaining: Vec<ConnectionId> = self.state.active.iter().map(|id| *id).collect();
        if !remaining.is_empty() {
            warn!(
                subgraph = %self.state.subgraph,
                connections = ?remaining,
                "Force-closing streaming connections"
            );
        }
        self.state.accepting.store(false, Ordering::SeqCst);
        self.state.token.cancel();
        self.state.force.cancel();
    }

    /// A session slot that stays open until the returned token is dropped
    #[cfg(test)]
    pub(crate) fn hold_session(&self) -> tokio_util::task::TaskTrackerToken {
        self.state.tracker.token()
    }
}

async fn upgrade(
    State(state): State<Arc<BindingState>>,
    protocol: GraphQLProtocol,
    headers: HeaderMap,
    upgrade: WebSocketUpgrade,
) -> Response {
    if !state.accepting.load(Ordering::SeqCst) || state.tracker.is_closed() {
        state.metrics.record_rejection();
        return ExecutionError::unavailable(&state.subgraph).into_response();
    }

    // Counted from the handshake on, so a drain cannot miss a session that
    // is still being upgraded
    let in_flight = state.tracker.token();
    let scope = ConnectionScope::new(ConnectionId::new(), state.token.child_token());
    let request = RequestContext::new(headers);
    let session_state = Arc::clone(&state);

    upgrade
        .protocols(async_graphql::http::ALL_WEBSOCKET_PROTOCOLS)
        .max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let state = session_state;
            let id = scope.id();
            state.active.insert(id);
            state.metrics.record_stream_connect();
            info!(
                subgraph = %state.subgraph,
                connection_id = %id,
                host = %state.identity,
                "Streaming connection accepted"
            );

            let connection = StreamConnection::new(
                scope,
                state.force.clone(),
                state.config.outbound_buffer,
                state.config.close_grace,
            );
            let result = connection
                .serve(socket, state.schema.clone(), protocol, request)
                .await;

            state.active.remove(&id);
            state.metrics.record_stream_disconnect();
            match result {
                Ok(()) => {
                    info!(subgraph = %state.subgraph, connection_id = %id, "Streaming connection closed");
                }
                Err(e) => {
                    if matches!(e, StreamConnectionError::ForceClosed(_)) {
                        state.metrics.record_forced_close();
                    }
                    warn!(subgraph = %state.subgraph, connection_id = %id, error = %e, "Streaming connection failed");
                }
            }
            drop(in_flight);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::SubgraphDescriptor;
    use crate::schema::{FieldDef, SchemaDefinition, SchemaProvider, StreamFieldDef, TypeShape};
    use crate::stream::EventCatalog;
    use serde_json::json;

    fn provided() -> ProvidedSchema {
        let descriptor = SubgraphDescriptor::new("reviews", || {
            Ok(SchemaDefinition::new()
                .query_field(FieldDef::new("ping", TypeShape::named("String")))
                .subscription_field(StreamFieldDef::new(
                    "reviewAdded",
                    TypeShape::named("String"),
                    EventCatalog::new("reviewAdded", vec![json!("r1")])?,
                )))
        })
        .with_streaming();
        SchemaProvider::new(
            ProcessIdentity::default(),
            Duration::from_millis(10),
            true,
            Arc::new(GatewayMetrics::new()),
        )
        .provide(&descriptor)
        .unwrap()
    }

    fn bind(listener: &mut SharedListener) -> Result<StreamingBinding, ConfigError> {
        StreamingTransportBinder::new().bind(
            listener,
            "/reviews/graphql",
            &provided(),
            &StreamingConfig::default(),
            Arc::new(GatewayMetrics::new()),
            ProcessIdentity::default(),
        )
    }

    #[test]
    fn test_second_bind_on_same_path_conflicts() {
        let mut listener = SharedListener::new("127.0.0.1:0".parse().unwrap());
        bind(&mut listener).unwrap();
        assert!(matches!(
            bind(&mut listener),
            Err(ConfigError::RouteConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_dispose_without_connections_is_immediate() {
        let mut listener = SharedListener::new("127.0.0.1:0".parse().unwrap());
        let binding = bind(&mut listener).unwrap();
        assert!(binding.is_accepting());

        binding.dispose(Duration::from_millis(50)).await.unwrap();
        assert!(!binding.is_accepting());
        assert_eq!(binding.active_connections(), 0);

        // second dispose is a no-op
        binding.dispose(Duration::from_millis(50)).await.unwrap();
    }

    #[tokio::test]
    async fn test_dispose_times_out_then_force_closes() {
        let mut listener = SharedListener::new("127.0.0.1:0".parse().unwrap());
        let binding = bind(&mut listener).unwrap();
        let session = binding.hold_session();

        let err = binding.dispose(Duration::from_millis(30)).await.unwrap_err();
        assert_eq!(err.subgraph, "reviews");
        assert_eq!(err.remaining, 1);
        assert_eq!(err.grace, Duration::from_millis(30));
        assert!(binding.state.token.is_cancelled());
        assert!(!binding.state.force.is_cancelled());

        binding.force_close();
        assert!(binding.state.force.is_cancelled());
        assert!(!binding.is_accepting());

        drop(session);
        binding.dispose(Duration::from_millis(30)).await.unwrap();
    }
}
