//! Composition Router - mounts every configured subgraph on one listener.
//!
//! Provisioning is sequential and all-or-nothing: schema, then streaming
//! transport (if any), then query engine, for each descriptor in order. The
//! port is only bound once every subgraph is mounted. Shutdown drains the
//! streaming binders first and closes the listener last.

use crate::domain::config::GatewayConfig;
use crate::domain::descriptor::{validate_descriptors, ProcessIdentity, SubgraphDescriptor};
use crate::domain::error::GatewayError;
use crate::engine::QueryEngine;
use crate::listener::SharedListener;
use crate::middleware::GatewayMetrics;
use crate::schema::SchemaProvider;
use crate::ws::{StreamingBinding, StreamingTransportBinder};
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Router lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterState {
    Idle,
    /// Building descriptor `index`
    Provisioning { index: usize, subgraph: String },
    Listening { addr: SocketAddr },
    Draining,
    Stopped,
}

impl fmt::Display for RouterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterState::Idle => f.write_str("idle"),
            RouterState::Provisioning { index, subgraph } => {
                write!(f, "provisioning({}: {})", index, subgraph)
            }
            RouterState::Listening { addr } => write!(f, "listening({})", addr),
            RouterState::Draining => f.write_str("draining"),
            RouterState::Stopped => f.write_str("stopped"),
        }
    }
}

/// Hosts a fixed set of subgraphs behind one listener
pub struct CompositionRouter {
    config: GatewayConfig,
    identity: ProcessIdentity,
    descriptors: Vec<SubgraphDescriptor>,
    metrics: Arc<GatewayMetrics>,
    state_tx: watch::Sender<RouterState>,
    engines: Vec<QueryEngine>,
    bindings: Vec<StreamingBinding>,
    shutdown: CancellationToken,
    server: Option<JoinHandle<std::io::Result<()>>>,
    local_addr: Option<SocketAddr>,
}

impl CompositionRouter {
    /// Validate configuration and descriptors. Nothing is built or bound yet.
    pub fn new(
        config: GatewayConfig,
        identity: ProcessIdentity,
        descriptors: Vec<SubgraphDescriptor>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        validate_descriptors(&descriptors)?;

        let (state_tx, _) = watch::channel(RouterState::Idle);
        Ok(Self {
            config,
            identity,
            descriptors,
            metrics: Arc::new(GatewayMetrics::new()),
            state_tx,
            engines: Vec::new(),
            bindings: Vec::new(),
            shutdown: CancellationToken::new(),
            server: None,
            local_addr: None,
        })
    }

    pub fn state(&self) -> RouterState {
        self.state_tx.borrow().clone()
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<RouterState> {
        self.state_tx.subscribe()
    }

    /// Bound address once listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn identity(&self) -> &ProcessIdentity {
        &self.identity
    }

    /// Provision every subgraph, then bind and start serving.
    ///
    /// On any failure the router ends up `Stopped` with nothing bound.
    pub async fn start(&mut self) -> Result<SocketAddr, GatewayError> {
        let current = self.state();
        if current != RouterState::Idle {
            return Err(GatewayError::InvalidState {
                expected: "idle",
                found: current.to_string(),
            });
        }

        info!(
            host = %self.identity,
            subgraphs = self.descriptors.len(),
            "Starting subgraph host"
        );

        let mut listener = SharedListener::new(self.config.http_addr());
        if let Err(e) = self.provision(&mut listener) {
            error!(error = %e, "Provisioning failed, aborting startup");
            self.abort();
            return Err(e);
        }

        let tcp = match listener.bind().await {
            Ok(tcp) => tcp,
            Err(e) => {
                error!(error = %e, "Failed to bind shared listener");
                self.abort();
                return Err(e);
            }
        };
        let addr = match tcp.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.abort();
                return Err(GatewayError::Io(e));
            }
        };

        let app = listener.into_router(
            &self.config.cors,
            self.identity.clone(),
            Arc::clone(&self.metrics),
        );
        let signal = self.shutdown.clone().cancelled_owned();
        self.server = Some(tokio::spawn(async move {
            axum::serve(tcp, app).with_graceful_shutdown(signal).await
        }));
        self.local_addr = Some(addr);
        self.state_tx.send_replace(RouterState::Listening { addr });

        for engine in &self.engines {
            info!(subgraph = %engine.subgraph(), url = %format!("http://{}{}", addr, engine.path()), "Subgraph ready");
        }
        info!(addr = %addr, "Subgraph host listening");
        Ok(addr)
    }

    fn provision(&mut self, listener: &mut SharedListener) -> Result<(), GatewayError> {
        let provider = SchemaProvider::new(
            self.identity.clone(),
            self.config.streaming.event_interval,
            self.config.engine.introspection,
            Arc::clone(&self.metrics),
        );
        let binder = StreamingTransportBinder::new();

        for (index, descriptor) in self.descriptors.iter().enumerate() {
            self.state_tx.send_replace(RouterState::Provisioning {
                index,
                subgraph: descriptor.name().to_string(),
            });

            let schema = provider
                .provide(descriptor)
                .map_err(|source| GatewayError::SchemaBuild {
                    subgraph: descriptor.name().to_string(),
                    source,
                })?;

            let path = descriptor.path();

            // Transport first: the path must be complete before anything is bound
            if descriptor.supports_streaming() {
                let binding = binder.bind(
                    listener,
                    &path,
                    &schema,
                    &self.config.streaming,
                    Arc::clone(&self.metrics),
                    self.identity.clone(),
                )?;
                self.bindings.push(binding);
            }

            let engine = QueryEngine::new(
                schema,
                path,
                self.config.engine.request_timeout,
                Arc::clone(&self.metrics),
            );
            engine.start(listener)?;
            self.engines.push(engine);
        }

        Ok(())
    }

    fn abort(&mut self) {
        for engine in &self.engines {
            engine.stop();
        }
        self.engines.clear();
        self.bindings.clear();
        self.local_addr = None;
        self.state_tx.send_replace(RouterState::Stopped);
    }

    /// Drain streaming connections, stop the engines, then close the listener.
    ///
    /// Idempotent once stopped.
    pub async fn shutdown(&mut self) -> Result<(), GatewayError> {
        match self.state() {
            RouterState::Listening { .. } => {}
            RouterState::Stopped => return Ok(()),
            other => {
                return Err(GatewayError::InvalidState {
                    expected: "listening",
                    found: other.to_string(),
                })
            }
        }

        self.state_tx.send_replace(RouterState::Draining);
        info!(host = %self.identity, "Draining subgraph host");

        for engine in &self.engines {
            engine.begin_drain();
        }

        let grace = self.config.shutdown.drain_grace;
        for binding in &self.bindings {
            if let Err(e) = binding.dispose(grace).await {
                warn!(subgraph = %binding.subgraph(), error = %e, "Forcing remaining connections closed");
                binding.force_close();
            }
        }

        // Engines stop while the listener still exists
        for engine in &self.engines {
            engine.stop();
        }

        self.shutdown.cancel();
        let mut result = Ok(());
        if let Some(mut server) = self.server.take() {
            match tokio::time::timeout(self.config.shutdown.deadline, &mut server).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => {
                    error!(error = %e, "Listener failed during shutdown");
                    result = Err(GatewayError::Server(e.to_string()));
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Listener task failed");
                    result = Err(GatewayError::Server(e.to_string()));
                }
                Err(_) => {
                    warn!(
                        deadline_ms = self.config.shutdown.deadline.as_millis() as u64,
                        "Listener did not close before the deadline, aborting"
                    );
                    server.abort();
                }
            }
        }

        self.state_tx.send_replace(RouterState::Stopped);
        info!("Subgraph host stopped");
        result
    }

    /// Start, serve until `signal` resolves, then shut down.
    pub async fn run_until<F>(mut self, signal: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        signal.await;
        self.shutdown().await
    }
}
