//! # Host Configuration
//!
//! Environment-derived configuration for the `subgraph-host` binary.
//!
//! | Variable | Default | Maps to |
//! |----------|---------|---------|
//! | `PORT` | `4001` | `http.port` |
//! | `HOST` | `0.0.0.0` | `http.host` |
//! | `HOSTNAME` | `unknown` | process identity |
//! | `SUBGRAPH_MOCKS` | empty | subgraphs served with mocked data |
//! | `SUBGRAPH_EVENT_INTERVAL_MS` | `3000` | `streaming.event_interval` |
//! | `SUBGRAPH_DRAIN_GRACE_MS` | `5000` | `shutdown.drain_grace` |
//! | `SUBGRAPH_SHUTDOWN_DEADLINE_MS` | `15000` | `shutdown.deadline` |
//! | `SUBGRAPH_INTROSPECTION` | `true` | `engine.introspection` |

use serde::Serialize;
use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;
use subgraph_gateway::{ConfigError, GatewayConfig, ProcessIdentity};
use thiserror::Error;

/// Host configuration errors.
#[derive(Debug, Error)]
pub enum HostConfigError {
    /// A variable is set but cannot be parsed.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// The resulting gateway configuration is rejected.
    #[error(transparent)]
    Gateway(#[from] ConfigError),
}

/// Complete host configuration.
#[derive(Debug, Clone, Serialize)]
pub struct HostConfig {
    /// Label for logs and health output.
    pub hostname: String,
    /// Subgraph names to serve with mocked data.
    pub mocks: Vec<String>,
    /// Gateway settings.
    pub gateway: GatewayConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            hostname: ProcessIdentity::default().hostname().to_string(),
            mocks: Vec::new(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl HostConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, HostConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// Unset or blank variables keep their defaults. The result is validated
    /// before it is returned.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HostConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(hostname) = get("HOSTNAME") {
            config.hostname = hostname.trim().to_string();
        }

        if let Some(mocks) = get("SUBGRAPH_MOCKS") {
            config.mocks = mocks
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        let gateway = &mut config.gateway;
        if let Some(port) = get("PORT") {
            gateway.http.port = parse("PORT", &port)?;
        }
        if let Some(host) = get("HOST") {
            gateway.http.host = parse::<IpAddr>("HOST", &host)?;
        }
        if let Some(ms) = get("SUBGRAPH_EVENT_INTERVAL_MS") {
            gateway.streaming.event_interval = millis("SUBGRAPH_EVENT_INTERVAL_MS", &ms)?;
        }
        if let Some(ms) = get("SUBGRAPH_DRAIN_GRACE_MS") {
            gateway.shutdown.drain_grace = millis("SUBGRAPH_DRAIN_GRACE_MS", &ms)?;
        }
        if let Some(ms) = get("SUBGRAPH_SHUTDOWN_DEADLINE_MS") {
            gateway.shutdown.deadline = millis("SUBGRAPH_SHUTDOWN_DEADLINE_MS", &ms)?;
        }
        if let Some(flag) = get("SUBGRAPH_INTROSPECTION") {
            gateway.engine.introspection = boolean("SUBGRAPH_INTROSPECTION", &flag)?;
        }

        config.gateway.validate()?;
        Ok(config)
    }

    /// Identity passed to the router.
    pub fn identity(&self) -> ProcessIdentity {
        ProcessIdentity::new(self.hostname.clone())
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, HostConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| HostConfigError::InvalidVar {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn millis(var: &'static str, value: &str) -> Result<Duration, HostConfigError> {
    parse::<u64>(var, value).map(Duration::from_millis)
}

fn boolean(var: &'static str, value: &str) -> Result<bool, HostConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(HostConfigError::InvalidVar {
            var,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
