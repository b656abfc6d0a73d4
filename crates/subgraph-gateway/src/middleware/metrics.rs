//! Gateway metrics.
//!
//! Plain atomic counters, exported as JSON at `/metrics` and, with the
//! `metrics` feature, in Prometheus text format.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Subgraph gateway metrics
#[derive(Default)]
pub struct GatewayMetrics {
    // Query/mutation counters
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_error: AtomicU64,
    pub requests_rejected: AtomicU64,

    // Streaming counters
    pub stream_connections: AtomicU64,
    pub stream_connections_total: AtomicU64,
    pub stream_subscriptions: AtomicU64,
    pub stream_events_sent: AtomicU64,
    pub stream_forced_closes: AtomicU64,

    // Mean latency only
    pub total_latency_ms: AtomicU64,
    pub request_count_for_latency: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an executed query or mutation
    pub fn record_request(&self, success: bool, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        if success {
            self.requests_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }

        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
        self.request_count_for_latency
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request turned away by a stopped engine or a draining binder
    pub fn record_rejection(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_connect(&self) {
        self.stream_connections.fetch_add(1, Ordering::Relaxed);
        self.stream_connections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_disconnect(&self) {
        self.stream_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_stream_event(&self) {
        self.stream_events_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forced_close(&self) {
        self.stream_forced_closes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.request_count_for_latency.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "# HELP subgraph_requests_total Total number of GraphQL requests\n\
             # TYPE subgraph_requests_total counter\n\
             subgraph_requests_total {}\n",
            self.requests_total.load(Ordering::Relaxed)
        ));

        output.push_str(&format!(
            "# HELP subgraph_requests_error_total Requests answered with errors\n\
             # TYPE subgraph_requests_error_total counter\n\
             subgraph_requests_error_total {}\n",
            self.requests_error.load(Ordering::Relaxed)
        ));

        output.push_str(&format!(
            "# HELP subgraph_requests_rejected_total Requests rejected while not serving\n\
             # TYPE subgraph_requests_rejected_total counter\n\
             subgraph_requests_rejected_total {}\n",
            self.requests_rejected.load(Ordering::Relaxed)
        ));

        output.push_str(&format!(
            "# HELP subgraph_stream_connections Active streaming connections\n\
             # TYPE subgraph_stream_connections gauge\n\
             subgraph_stream_connections {}\n",
            self.stream_connections.load(Ordering::Relaxed)
        ));

        output.push_str(&format!(
            "# HELP subgraph_stream_subscriptions Active subscription streams\n\
             # TYPE subgraph_stream_subscriptions gauge\n\
             subgraph_stream_subscriptions {}\n",
            self.stream_subscriptions.load(Ordering::Relaxed)
        ));

        output.push_str(&format!(
            "# HELP subgraph_stream_events_sent_total Events delivered to subscribers\n\
             # TYPE subgraph_stream_events_sent_total counter\n\
             subgraph_stream_events_sent_total {}\n",
            self.stream_events_sent.load(Ordering::Relaxed)
        ));

        output.push_str(&format!(
            "# HELP subgraph_average_latency_ms Average request latency\n\
             # TYPE subgraph_average_latency_ms gauge\n\
             subgraph_average_latency_ms {:.2}\n",
            self.average_latency_ms()
        ));

        output
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "success": self.requests_success.load(Ordering::Relaxed),
                "error": self.requests_error.load(Ordering::Relaxed),
                "rejected": self.requests_rejected.load(Ordering::Relaxed),
            },
            "streaming": {
                "connections": self.stream_connections.load(Ordering::Relaxed),
                "connections_total": self.stream_connections_total.load(Ordering::Relaxed),
                "subscriptions": self.stream_subscriptions.load(Ordering::Relaxed),
                "events_sent": self.stream_events_sent.load(Ordering::Relaxed),
                "forced_closes": self.stream_forced_closes.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }
}

/// Request timing helper
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<GatewayMetrics>,
}

impl RequestTimer {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self, success: bool) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics.record_request(success, latency_ms);
    }
}

/// Counts one live subscription stream; decrements on drop
pub struct SubscriptionGuard {
    metrics: Arc<GatewayMetrics>,
}

impl SubscriptionGuard {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        metrics.stream_subscriptions.fetch_add(1, Ordering::Relaxed);
        Self { metrics }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.metrics
            .stream_subscriptions
            .fetch_sub(1, Ordering::Relaxed);
    }
}
