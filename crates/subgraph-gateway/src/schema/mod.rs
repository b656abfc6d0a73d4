//! Schema definitions and the provider that makes them executable.

pub mod definition;
pub mod mock;
pub mod provider;

pub use definition::{
    ArgDef, FieldDef, ObjectDef, RequestContext, ResolveError, ResolveInput, ResolverFn, SchemaDefinition,
    StreamFieldDef, TypeShape,
};
pub use mock::MockGenerator;
pub use provider::{ProvidedSchema, Provenance, SchemaProvider};
