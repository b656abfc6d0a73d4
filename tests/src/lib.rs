//! # Subgraph Host Test Suite
//!
//! End-to-end tests that run the real catalog behind a real listener on an
//! ephemeral port, talking to it over HTTP and WebSocket.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs    # Host startup, HTTP and graphql-transport-ws helpers
//!     ├── routing.rs    # Per-path isolation, health, metrics
//!     ├── streaming.rs  # reviewAdded cycle, independent subscriptions
//!     └── lifecycle.rs  # Startup failures, drain and close frames
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p subgraph-tests
//! cargo test -p subgraph-tests integration::streaming::
//!
//! # Benchmarks
//! cargo bench -p subgraph-tests
//! ```

pub mod integration;
