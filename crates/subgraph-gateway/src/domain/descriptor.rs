//! Subgraph descriptors and process identity.

use super::error::{ConfigError, SchemaBuildError};
use crate::schema::SchemaDefinition;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Produces the authored definition of one subgraph.
///
/// Must be pure: the provider may call it from any thread, exactly once per
/// descriptor.
pub type SchemaSupplier = Arc<dyn Fn() -> Result<SchemaDefinition, SchemaBuildError> + Send + Sync>;

/// Where a subgraph's schema comes from, resolved once at provisioning.
#[derive(Clone)]
pub enum SchemaSource {
    /// Serve the supplier's definition as written
    Authored(SchemaSupplier),
    /// Serve the supplier's shape with synthetic leaf values
    Mocked(SchemaSupplier),
}

impl SchemaSource {
    pub fn supplier(&self) -> &SchemaSupplier {
        match self {
            SchemaSource::Authored(supplier) | SchemaSource::Mocked(supplier) => supplier,
        }
    }

    pub fn is_mocked(&self) -> bool {
        matches!(self, SchemaSource::Mocked(_))
    }
}

impl fmt::Debug for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSource::Authored(_) => f.write_str("Authored"),
            SchemaSource::Mocked(_) => f.write_str("Mocked"),
        }
    }
}

/// One hosted subgraph. Immutable once built.
#[derive(Clone, Debug)]
pub struct SubgraphDescriptor {
    name: String,
    source: SchemaSource,
    supports_streaming: bool,
}

impl SubgraphDescriptor {
    /// Authored, non-streaming subgraph
    pub fn new<F>(name: impl Into<String>, supplier: F) -> Self
    where
        F: Fn() -> Result<SchemaDefinition, SchemaBuildError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            source: SchemaSource::Authored(Arc::new(supplier)),
            supports_streaming: false,
        }
    }

    /// Also bind a WebSocket transport at the subgraph path
    pub fn with_streaming(mut self) -> Self {
        self.supports_streaming = true;
        self
    }

    /// Serve synthetic data instead of the supplier's resolvers
    pub fn mocked(mut self) -> Self {
        self.source = SchemaSource::Mocked(self.source.supplier().clone());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mount path on the shared listener
    pub fn path(&self) -> String {
        format!("/{}/graphql", self.name)
    }

    pub fn source(&self) -> &SchemaSource {
        &self.source
    }

    pub fn supports_streaming(&self) -> bool {
        self.supports_streaming
    }

    pub fn uses_mock_data(&self) -> bool {
        self.source.is_mocked()
    }
}

/// Reject descriptor lists that would produce ambiguous routing.
pub fn validate_descriptors(descriptors: &[SubgraphDescriptor]) -> Result<(), ConfigError> {
    if descriptors.is_empty() {
        return Err(ConfigError::NoSubgraphs);
    }

    let mut seen = HashSet::with_capacity(descriptors.len());
    for descriptor in descriptors {
        validate_name(descriptor.name())?;
        if !seen.insert(descriptor.name()) {
            return Err(ConfigError::DuplicateSubgraph(descriptor.name().to_string()));
        }
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidSubgraphName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > 64 {
        return Err(invalid("name is longer than 64 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid("only ASCII letters, digits, '-' and '_' are allowed"));
    }
    Ok(())
}

/// Process identity, used only to label logs and health output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    hostname: String,
}

impl ProcessIdentity {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

impl Default for ProcessIdentity {
    fn default() -> Self {
        Self::new("unknown")
    }
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hostname)
    }
}
