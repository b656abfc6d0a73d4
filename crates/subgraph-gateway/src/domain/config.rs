//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

pub use super::error::ConfigError;

/// Default port when neither configuration nor `PORT` provide one
pub const DEFAULT_PORT: u16 = 4001;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Shared listener
    pub http: HttpConfig,
    /// WebSocket transports for streaming subgraphs
    pub streaming: StreamingConfig,
    /// Drain behaviour
    pub shutdown: ShutdownConfig,
    /// Query engine options
    pub engine: EngineConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.streaming.event_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "streaming.event_interval cannot be 0".into(),
            ));
        }

        if self.streaming.max_message_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "streaming.max_message_size cannot be 0".into(),
            ));
        }

        if self.streaming.outbound_buffer == 0 {
            return Err(ConfigError::InvalidLimit(
                "streaming.outbound_buffer cannot be 0".into(),
            ));
        }

        if self.shutdown.drain_grace.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "shutdown.drain_grace cannot be 0".into(),
            ));
        }

        if self.shutdown.deadline < self.shutdown.drain_grace {
            return Err(ConfigError::InvalidTimeout(
                "shutdown.deadline must not be shorter than shutdown.drain_grace".into(),
            ));
        }

        if self.engine.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "engine.request_timeout cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Shared listener bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// Shared listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 4001, 0 picks an ephemeral port)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: DEFAULT_PORT,
        }
    }
}

/// Streaming transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Pause between two events of one subscription
    #[serde(with = "duration_str")]
    pub event_interval: Duration,
    /// Largest accepted inbound frame in bytes
    pub max_message_size: usize,
    /// Frames queued for the socket writer before the session waits
    pub outbound_buffer: usize,
    /// How long a cancelled session may take to flush and send its close frame
    #[serde(with = "duration_str")]
    pub close_grace: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            event_interval: Duration::from_secs(3),
            max_message_size: 1024 * 1024, // 1MB
            outbound_buffer: 64,
            close_grace: Duration::from_secs(2),
        }
    }
}

/// Shutdown configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Bounded wait for streaming connections of one binder to close
    #[serde(with = "duration_str")]
    pub drain_grace: Duration,
    /// Hard limit for the listener to finish after the drain
    #[serde(with = "duration_str")]
    pub deadline: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_grace: Duration::from_secs(5),
            deadline: Duration::from_secs(15),
        }
    }
}

/// Query engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Serve `__schema` / `__type` queries
    pub introspection: bool,
    /// Upper bound for one query or mutation
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            introspection: true,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers ("*" for all)
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["*".to_string()],
            max_age: 86400, // 24 hours
        }
    }
}

/// `Duration` as `"250ms"`, `"3s"` or `"2m"`; a bare number means seconds.
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    const UNITS: [(&str, u64); 3] = [("ms", 1), ("s", 1_000), ("m", 60_000)];

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = duration.as_millis();
        if millis % 1_000 == 0 {
            serializer.collect_str(&format_args!("{}s", millis / 1_000))
        } else {
            serializer.collect_str(&format_args!("{}ms", millis))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid duration {:?}", raw)))
    }

    pub(super) fn parse(raw: &str) -> Option<Duration> {
        let raw = raw.trim();
        // first match wins, so "ms" must precede "s" and "m"
        let (digits, scale) = UNITS
            .iter()
            .find_map(|(suffix, scale)| raw.strip_suffix(suffix).map(|d| (d, *scale)))
            .unwrap_or((raw, 1_000));
        let value: u64 = digits.trim().parse().ok()?;
        value.checked_mul(scale).map(Duration::from_millis)
    }
}
