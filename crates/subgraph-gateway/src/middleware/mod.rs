//! Middleware stack for the subgraph gateway.
//!
//! Layer order: Request → CORS → Tracing → (Timeout, POST only) → Handler
//!
//! Metrics are not a layer; the engines and binders record into a shared
//! [`GatewayMetrics`] directly.

pub mod cors;
pub mod metrics;
pub mod timeout;
pub mod tracing;

pub use cors::create_cors_layer;
pub use metrics::{GatewayMetrics, RequestTimer, SubscriptionGuard};
pub use timeout::TimeoutLayer;
pub use tracing::TracingLayer;
