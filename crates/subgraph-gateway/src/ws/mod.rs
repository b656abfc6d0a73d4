//! WebSocket transport for streaming subgraphs.
//!
//! Speaks both `graphql-transport-ws` and the legacy `graphql-ws`
//! subprotocols (negotiated from `Sec-WebSocket-Protocol`). Every
//! subscription started on a connection gets its own event sequence.

pub mod binder;
pub mod connection;

pub use crate::domain::correlation::ConnectionId;
pub use binder::{StreamingBinding, StreamingTransportBinder};
pub use connection::{ConnectionScope, StreamConnection};
