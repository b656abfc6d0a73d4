//! Event Stream Source.
//!
//! A source owns a fixed, non-empty catalog. Every call to
//! [`EventStreamSource::produce`] starts an independent cursor at position 0
//! that walks the catalog in order and wraps around forever. The sequence
//! emits, then waits one interval before the next emission. The wait only
//! starts when the consumer pulls again, so a slow consumer delays itself and
//! nobody else.

use crate::domain::error::ConfigError;
use futures::stream::{self, BoxStream};
use serde_json::Value as Json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Lazy, infinite event sequence; ends only on cancellation.
pub type EventStream = BoxStream<'static, DomainEvent>;

/// One catalog entry. Identity is its position.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainEvent {
    pub position: usize,
    pub payload: Json,
}

/// Fixed, ordered, non-empty list of event payloads
#[derive(Debug, Clone)]
pub struct EventCatalog {
    name: String,
    events: Arc<[Json]>,
}

impl EventCatalog {
    pub fn new(name: impl Into<String>, events: Vec<Json>) -> Result<Self, ConfigError> {
        let name = name.into();
        if events.is_empty() {
            return Err(ConfigError::EmptyEventCatalog(name));
        }
        Ok(Self {
            name,
            events: events.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always false; construction rejects empty catalogs
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Json> {
        self.events.get(position)
    }

    pub fn cursor(&self) -> EventCursor {
        EventCursor {
            catalog: self.clone(),
            position: 0,
        }
    }
}

/// Position in a catalog, private to one subscription
#[derive(Debug, Clone)]
pub struct EventCursor {
    catalog: EventCatalog,
    position: usize,
}

impl EventCursor {
    /// Position of the event the next call to [`advance`](Self::advance) returns
    pub fn position(&self) -> usize {
        self.position
    }

    /// Return the current event and move to the next, wrapping to 0.
    pub fn advance(&mut self) -> DomainEvent {
        let position = self.position;
        let payload = self.catalog.events[position].clone();
        self.position = (position + 1) % self.catalog.len();
        DomainEvent { position, payload }
    }
}

/// Paced producer over a catalog
#[derive(Debug, Clone)]
pub struct EventStreamSource {
    catalog: EventCatalog,
    interval: Duration,
}

struct ProducerState {
    cursor: EventCursor,
    token: CancellationToken,
    interval: Duration,
    emitted: bool,
}

impl EventStreamSource {
    pub fn new(catalog: EventCatalog, interval: Duration) -> Self {
        Self { catalog, interval }
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start a fresh sequence at position 0.
    ///
    /// The token is checked before every emission and raced against every
    /// wait, so cancelling ends the stream without waiting out the interval.
    pub fn produce(&self, token: CancellationToken) -> EventStream {
        let state = ProducerState {
            cursor: self.catalog.cursor(),
            token,
            interval: self.interval,
            emitted: false,
        };

        Box::pin(stream::unfold(state, |mut state| async move {
            if state.emitted {
                tokio::select! {
                    biased;
                    _ = state.token.cancelled() => return None,
                    _ = tokio::time::sleep(state.interval) => {}
                }
            }
            if state.token.is_cancelled() {
                return None;
            }
            state.emitted = true;
            let event = state.cursor.advance();
            Some((event, state))
        }))
    }
}
