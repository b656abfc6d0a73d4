//! Declarative subgraph schema definitions.
//!
//! A supplier returns a [`SchemaDefinition`]: root fields, object types and
//! streaming subscription fields, each field optionally carrying a resolver.
//! The provider turns one definition into either an authored or a mocked
//! executable schema. Both share the exact same type shape.

use crate::stream::EventCatalog;
use async_graphql::dynamic::TypeRef;
use axum::http::HeaderMap;
use serde_json::{Map, Value as Json};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Built-in scalar names
pub const BUILTIN_SCALARS: [&str; 5] = [
    TypeRef::ID,
    TypeRef::STRING,
    TypeRef::INT,
    TypeRef::FLOAT,
    TypeRef::BOOLEAN,
];

/// Error a resolver reports; surfaces in the response `errors` array
pub type ResolveError = async_graphql::Error;

/// Field resolver over JSON values.
///
/// `Ok(None)` means null. Objects are returned as JSON objects and become the
/// parent of the nested field resolvers.
pub type ResolverFn =
    Arc<dyn Fn(&ResolveInput<'_>) -> Result<Option<Json>, ResolveError> + Send + Sync>;

/// Everything a resolver may look at
pub struct ResolveInput<'a> {
    /// Value of the enclosing object; `None` for root fields
    pub parent: Option<&'a Json>,
    pub args: &'a Map<String, Json>,
    /// Inbound request metadata; absent for subscription events
    pub request: Option<&'a RequestContext>,
}

impl<'a> ResolveInput<'a> {
    pub fn arg(&self, name: &str) -> Option<&'a Json> {
        self.args.get(name)
    }

    pub fn arg_str(&self, name: &str) -> Option<&'a str> {
        self.arg(name).and_then(Json::as_str)
    }

    pub fn arg_i64(&self, name: &str) -> Option<i64> {
        self.arg(name).and_then(Json::as_i64)
    }

    /// Field of the parent object
    pub fn parent_field(&self, name: &str) -> Option<&'a Json> {
        self.parent.and_then(|parent| parent.get(name))
    }
}

/// Per-request context built from the inbound HTTP request.
///
/// Opaque to the gateway; resolvers read whatever headers they need.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    headers: HeaderMap,
}

impl RequestContext {
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// GraphQL type reference with explicit nullability
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    Named { name: String, nullable: bool },
    List { item: Box<TypeShape>, nullable: bool },
}

impl TypeShape {
    /// Nullable named type
    pub fn named(name: impl Into<String>) -> Self {
        TypeShape::Named {
            name: name.into(),
            nullable: true,
        }
    }

    /// Non-null named type
    pub fn named_nn(name: impl Into<String>) -> Self {
        Self::named(name).non_null()
    }

    /// Nullable list of `item`
    pub fn list(item: TypeShape) -> Self {
        TypeShape::List {
            item: Box::new(item),
            nullable: true,
        }
    }

    pub fn non_null(self) -> Self {
        match self {
            TypeShape::Named { name, .. } => TypeShape::Named {
                name,
                nullable: false,
            },
            TypeShape::List { item, .. } => TypeShape::List {
                item,
                nullable: false,
            },
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            TypeShape::Named { nullable, .. } | TypeShape::List { nullable, .. } => *nullable,
        }
    }

    /// Innermost named type
    pub fn base_name(&self) -> &str {
        match self {
            TypeShape::Named { name, .. } => name,
            TypeShape::List { item, .. } => item.base_name(),
        }
    }

    pub fn to_type_ref(&self) -> TypeRef {
        let (inner, nullable) = match self {
            TypeShape::Named { name, nullable } => (TypeRef::Named(name.clone().into()), *nullable),
            TypeShape::List { item, nullable } => {
                (TypeRef::List(Box::new(item.to_type_ref())), *nullable)
            }
        };
        if nullable {
            inner
        } else {
            TypeRef::NonNull(Box::new(inner))
        }
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_type_ref())
    }
}

/// Field argument
#[derive(Debug, Clone)]
pub struct ArgDef {
    pub name: String,
    pub shape: TypeShape,
}

/// Object field
#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub shape: TypeShape,
    pub args: Vec<ArgDef>,
    pub description: Option<String>,
    /// `None` reads `parent[name]`
    pub resolver: Option<ResolverFn>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, shape: TypeShape) -> Self {
        Self {
            name: name.into(),
            shape,
            args: Vec::new(),
            description: None,
            resolver: None,
        }
    }

    pub fn argument(mut self, name: impl Into<String>, shape: TypeShape) -> Self {
        self.args.push(ArgDef {
            name: name.into(),
            shape,
        });
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn resolve<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&ResolveInput<'_>) -> Result<Option<Json>, ResolveError> + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("args", &self.args)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Object type
#[derive(Debug, Clone)]
pub struct ObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
}

impl ObjectDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Subscription field fed by a cyclic event catalog.
///
/// Each event payload is shaped into `shape` exactly like a resolver result.
#[derive(Debug, Clone)]
pub struct StreamFieldDef {
    pub name: String,
    pub shape: TypeShape,
    pub catalog: EventCatalog,
    /// Overrides the gateway's event interval for this field
    pub interval: Option<Duration>,
}

impl StreamFieldDef {
    pub fn new(name: impl Into<String>, shape: TypeShape, catalog: EventCatalog) -> Self {
        Self {
            name: name.into(),
            shape,
            catalog,
            interval: None,
        }
    }

    pub fn every(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

/// Complete definition of one subgraph schema
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    pub query: ObjectDef,
    pub mutation: Option<ObjectDef>,
    pub subscription: Vec<StreamFieldDef>,
    pub types: Vec<ObjectDef>,
}

impl SchemaDefinition {
    pub const QUERY: &'static str = "Query";
    pub const MUTATION: &'static str = "Mutation";
    pub const SUBSCRIPTION: &'static str = "Subscription";

    pub fn new() -> Self {
        Self {
            query: ObjectDef::new(Self::QUERY),
            mutation: None,
            subscription: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn query_field(mut self, field: FieldDef) -> Self {
        self.query.fields.push(field);
        self
    }

    pub fn mutation_field(mut self, field: FieldDef) -> Self {
        self.mutation
            .get_or_insert_with(|| ObjectDef::new(Self::MUTATION))
            .fields
            .push(field);
        self
    }

    pub fn subscription_field(mut self, field: StreamFieldDef) -> Self {
        self.subscription.push(field);
        self
    }

    pub fn object(mut self, object: ObjectDef) -> Self {
        self.types.push(object);
        self
    }

    /// Root and non-root object types, in registration order
    pub fn objects(&self) -> impl Iterator<Item = &ObjectDef> {
        std::iter::once(&self.query)
            .chain(self.mutation.iter())
            .chain(self.types.iter())
    }
}

impl Default for SchemaDefinition {
    fn default() -> Self {
        Self::new()
    }
}
