//! One accepted streaming connection.
//!
//! The GraphQL WebSocket protocol runs against a channel; a separate writer
//! drains that channel into the socket. Server-side cancellation ends the
//! inbound half, which tears down every subscription of the session, and the
//! writer then finishes with a normal close frame.

use crate::domain::correlation::ConnectionId;
use crate::domain::error::StreamConnectionError;
use crate::schema::RequestContext;
use async_graphql::dynamic::Schema;
use async_graphql::Data;
use async_graphql_axum::{GraphQLProtocol, GraphQLWebSocket};
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::channel::mpsc;
use futures::{Sink, SinkExt, StreamExt};
use std::fmt::Display;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Reason sent with the close frame when the server ends a session
pub const SHUTDOWN_REASON: &str = "server shutting down";

/// Per-connection handle made visible to subscription resolvers.
///
/// Every subscription opened on the connection derives its own cancellation
/// from `token`.
#[derive(Debug, Clone)]
pub struct ConnectionScope {
    id: ConnectionId,
    token: CancellationToken,
}

impl ConnectionScope {
    pub fn new(id: ConnectionId, token: CancellationToken) -> Self {
        Self { id, token }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// A live WebSocket session bound to one subgraph schema
pub struct StreamConnection {
    scope: ConnectionScope,
    force: CancellationToken,
    outbound_buffer: usize,
    close_grace: Duration,
}

impl StreamConnection {
    /// `force` drops the socket without a close handshake. `close_grace`
    /// bounds the final close frame and flush after a server-side cancel.
    pub fn new(
        scope: ConnectionScope,
        force: CancellationToken,
        outbound_buffer: usize,
        close_grace: Duration,
    ) -> Self {
        Self {
            scope,
            force,
            outbound_buffer,
            close_grace,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.scope.id()
    }

    /// Run the session until the client leaves, the protocol closes it, or
    /// the server cancels it.
    pub async fn serve(
        self,
        socket: WebSocket,
        schema: Schema,
        protocol: GraphQLProtocol,
        request: RequestContext,
    ) -> Result<(), StreamConnectionError> {
        let started = Instant::now();
        let token = self.scope.token().clone();
        let (mut sink, stream) = socket.split();
        let (tx, mut rx) = mpsc::channel::<Message>(self.outbound_buffer);

        let mut data = Data::default();
        data.insert(self.scope.clone());
        data.insert(request);

        let inbound = stream.take_until(token.clone().cancelled_owned());
        let session = GraphQLWebSocket::new_with_pair(tx, inbound, schema, protocol)
            .with_data(data)
            .serve();

        let writer = async {
            let mut protocol_closed = false;
            while let Some(message) = rx.next().await {
                protocol_closed |= matches!(message, Message::Close(_));
                sink.send(message)
                    .await
                    .map_err(|e| StreamConnectionError::Transport(e.to_string()))?;
            }

            let frame = (token.is_cancelled() && !protocol_closed).then(|| CloseFrame {
                code: close_code::NORMAL,
                reason: SHUTDOWN_REASON.into(),
            });
            close_within(&mut sink, frame, self.close_grace).await
        };

        tokio::select! {
            _ = self.force.cancelled() => {
                warn!(connection_id = %self.scope.id(), "Connection force-closed");
                Err(StreamConnectionError::ForceClosed(started.elapsed()))
            }
            (_, written) = futures::future::join(session, writer) => {
                debug!(
                    connection_id = %self.scope.id(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Session finished"
                );
                written
            }
        }
    }
}

/// Send `frame` (if any) and close `sink`, giving up after `grace`.
///
/// Only the close frame itself is an error; a failing final flush means the
/// peer is already gone.
async fn close_within<S>(
    sink: &mut S,
    frame: Option<CloseFrame<'static>>,
    grace: Duration,
) -> Result<(), StreamConnectionError>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let closing = async {
        if let Some(frame) = frame {
            sink.send(Message::Close(Some(frame)))
                .await
                .map_err(|e| StreamConnectionError::Transport(e.to_string()))?;
        }
        let _ = sink.close().await;
        Ok(())
    };

    tokio::time::timeout(grace, closing)
        .await
        .unwrap_or(Err(StreamConnectionError::CloseTimeout(grace)))
}
