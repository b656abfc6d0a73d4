//! Cyclic, time-paced event production for subscription fields.

pub mod source;

pub use source::{DomainEvent, EventCatalog, EventCursor, EventStream, EventStreamSource};
