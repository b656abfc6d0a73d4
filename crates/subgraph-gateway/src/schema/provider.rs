//! Schema Provider.
//!
//! Turns a [`SubgraphDescriptor`] into an executable dynamic schema. The
//! supplier runs exactly once; a panic or error there becomes a
//! [`SchemaBuildError`]. The schema source (authored or mocked) is resolved
//! here and nowhere else.

use super::definition::{
    FieldDef, ObjectDef, SchemaDefinition, StreamFieldDef, TypeShape, BUILTIN_SCALARS,
};
use super::mock::MockGenerator;
use super::RequestContext;
use crate::domain::descriptor::{ProcessIdentity, SchemaSource, SchemaSupplier, SubgraphDescriptor};
use crate::domain::error::SchemaBuildError;
use crate::middleware::metrics::{GatewayMetrics, SubscriptionGuard};
use crate::stream::EventStreamSource;
use crate::ws::ConnectionScope;
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext, Schema, Subscription,
    SubscriptionField, SubscriptionFieldFuture,
};
use async_graphql::Value as ConstValue;
use futures::stream::{BoxStream, StreamExt};
use serde_json::{Map, Value as Json};
use std::collections::HashSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Which variant of the definition is being served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Authored,
    Mocked,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Authored => f.write_str("authored"),
            Provenance::Mocked => f.write_str("mocked"),
        }
    }
}

/// Executable schema for one subgraph
#[derive(Clone)]
pub struct ProvidedSchema {
    pub subgraph: String,
    pub schema: Schema,
    pub provenance: Provenance,
    /// Names of the subscription fields
    pub stream_fields: Vec<String>,
}

impl ProvidedSchema {
    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }

    pub fn has_subscriptions(&self) -> bool {
        !self.stream_fields.is_empty()
    }
}

/// Builds schemas from descriptors
#[derive(Clone)]
pub struct SchemaProvider {
    identity: ProcessIdentity,
    event_interval: Duration,
    introspection: bool,
    metrics: Arc<GatewayMetrics>,
}

impl SchemaProvider {
    pub fn new(
        identity: ProcessIdentity,
        event_interval: Duration,
        introspection: bool,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            identity,
            event_interval,
            introspection,
            metrics,
        }
    }

    /// Build the schema for `descriptor`.
    pub fn provide(&self, descriptor: &SubgraphDescriptor) -> Result<ProvidedSchema, SchemaBuildError> {
        let definition = invoke_supplier(descriptor.source().supplier())?;
        validate_definition(&definition)?;

        if descriptor.supports_streaming() && definition.subscription.is_empty() {
            return Err(SchemaBuildError::Invalid(format!(
                "subgraph {} supports streaming but defines no subscription fields",
                descriptor.name()
            )));
        }
        if !descriptor.supports_streaming() && !definition.subscription.is_empty() {
            warn!(
                subgraph = %descriptor.name(),
                "Subscription fields defined without streaming support; they are unreachable"
            );
        }

        let (provenance, mock) = match descriptor.source() {
            SchemaSource::Authored(_) => (Provenance::Authored, None),
            SchemaSource::Mocked(_) => (Provenance::Mocked, Some(MockGenerator::new())),
        };

        let schema = self.build(descriptor.name(), &definition, mock)?;

        info!(
            subgraph = %descriptor.name(),
            provenance = %provenance,
            types = definition.types.len(),
            subscriptions = definition.subscription.len(),
            "Schema provisioned"
        );

        Ok(ProvidedSchema {
            subgraph: descriptor.name().to_string(),
            schema,
            provenance,
            stream_fields: definition.subscription.iter().map(|f| f.name.clone()).collect(),
        })
    }

    fn build(
        &self,
        subgraph: &str,
        definition: &SchemaDefinition,
        mock: Option<MockGenerator>,
    ) -> Result<Schema, SchemaBuildError> {
        let objects: Arc<HashSet<String>> =
            Arc::new(definition.objects().map(|o| o.name.clone()).collect());

        let mut builder = Schema::build(
            &definition.query.name,
            definition.mutation.as_ref().map(|m| m.name.as_str()),
            (!definition.subscription.is_empty()).then_some(SchemaDefinition::SUBSCRIPTION),
        );

        for object in definition.objects() {
            builder = builder.register(build_object(object, &objects, mock));
        }

        if !definition.subscription.is_empty() {
            let mut subscription = Subscription::new(SchemaDefinition::SUBSCRIPTION);
            for field in &definition.subscription {
                subscription = subscription.field(self.build_stream_field(subgraph, field, &objects));
            }
            builder = builder.register(subscription);
        }

        if !self.introspection {
            builder = builder.disable_introspection();
        }

        builder
            .data(self.identity.clone())
            .finish()
            .map_err(|e| SchemaBuildError::Invalid(e.to_string()))
    }

    fn build_stream_field(
        &self,
        subgraph: &str,
        field: &StreamFieldDef,
        objects: &Arc<HashSet<String>>,
    ) -> SubscriptionField {
        let plan = Arc::new(StreamPlan {
            subgraph: subgraph.to_string(),
            field: field.name.clone(),
            shape: field.shape.clone(),
            objects: Arc::clone(objects),
            source: EventStreamSource::new(
                field.catalog.clone(),
                field.interval.unwrap_or(self.event_interval),
            ),
            identity: self.identity.clone(),
            metrics: Arc::clone(&self.metrics),
        });

        SubscriptionField::new(field.name.clone(), field.shape.to_type_ref(), move |ctx| {
            let plan = Arc::clone(&plan);
            let scope = ctx.ctx.data_opt::<ConnectionScope>().cloned();
            SubscriptionFieldFuture::new(async move {
                Ok::<_, async_graphql::Error>(plan.open(scope))
            })
        })
    }
}

fn invoke_supplier(supplier: &SchemaSupplier) -> Result<SchemaDefinition, SchemaBuildError> {
    match catch_unwind(AssertUnwindSafe(|| supplier())) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(SchemaBuildError::SupplierPanicked(message))
        }
    }
}

/// Structural checks with friendlier messages than the schema builder gives.
fn validate_definition(definition: &SchemaDefinition) -> Result<(), SchemaBuildError> {
    if definition.query.fields.is_empty() {
        return Err(SchemaBuildError::Invalid(format!(
            "{} type defines no fields",
            definition.query.name
        )));
    }

    let mut type_names = HashSet::new();
    for object in definition.objects() {
        if BUILTIN_SCALARS.contains(&object.name.as_str()) {
            return Err(SchemaBuildError::Invalid(format!(
                "object {} shadows a built-in scalar",
                object.name
            )));
        }
        if !type_names.insert(object.name.as_str()) {
            return Err(SchemaBuildError::Invalid(format!(
                "type {} is defined twice",
                object.name
            )));
        }
    }
    if !definition.subscription.is_empty() && !type_names.insert(SchemaDefinition::SUBSCRIPTION) {
        return Err(SchemaBuildError::Invalid(format!(
            "type {} is reserved for stream fields",
            SchemaDefinition::SUBSCRIPTION
        )));
    }

    let known = |shape: &TypeShape| {
        let base = shape.base_name();
        BUILTIN_SCALARS.contains(&base) || type_names.contains(base)
    };

    for object in definition.objects() {
        let mut field_names = HashSet::new();
        for field in &object.fields {
            if !field_names.insert(field.name.as_str()) {
                return Err(SchemaBuildError::Invalid(format!(
                    "field {}.{} is defined twice",
                    object.name, field.name
                )));
            }
            if !known(&field.shape) {
                return Err(SchemaBuildError::Invalid(format!(
                    "field {}.{} has unknown type {}",
                    object.name,
                    field.name,
                    field.shape.base_name()
                )));
            }
            if let Some(arg) = field.args.iter().find(|a| !known(&a.shape)) {
                return Err(SchemaBuildError::Invalid(format!(
                    "argument {}.{}({}) has unknown type {}",
                    object.name,
                    field.name,
                    arg.name,
                    arg.shape.base_name()
                )));
            }
        }
    }

    let mut stream_names = HashSet::new();
    for field in &definition.subscription {
        if !stream_names.insert(field.name.as_str()) {
            return Err(SchemaBuildError::Invalid(format!(
                "subscription field {} is defined twice",
                field.name
            )));
        }
        if !known(&field.shape) {
            return Err(SchemaBuildError::Invalid(format!(
                "subscription field {} has unknown type {}",
                field.name,
                field.shape.base_name()
            )));
        }
    }

    Ok(())
}

fn build_object(
    object: &ObjectDef,
    objects: &Arc<HashSet<String>>,
    mock: Option<MockGenerator>,
) -> Object {
    let mut built = Object::new(object.name.clone());
    if let Some(description) = &object.description {
        built = built.description(description.clone());
    }
    for field in &object.fields {
        built = built.field(build_field(field, objects, mock));
    }
    built
}

fn build_field(field: &FieldDef, objects: &Arc<HashSet<String>>, mock: Option<MockGenerator>) -> Field {
    let plan = Arc::new(FieldPlan {
        field: field.clone(),
        objects: Arc::clone(objects),
        mock,
    });

    let mut built = Field::new(field.name.clone(), field.shape.to_type_ref(), move |ctx| {
        let outcome = plan.resolve(&ctx);
        FieldFuture::new(async move { outcome })
    });
    for arg in &field.args {
        built = built.argument(InputValue::new(arg.name.clone(), arg.shape.to_type_ref()));
    }
    if let Some(description) = &field.description {
        built = built.description(description.clone());
    }
    built
}

/// Resolution of one object field
struct FieldPlan {
    field: FieldDef,
    objects: Arc<HashSet<String>>,
    mock: Option<MockGenerator>,
}

impl FieldPlan {
    fn resolve<'a>(&self, ctx: &ResolverContext<'a>) -> async_graphql::Result<Option<FieldValue<'a>>> {
        let parent = ctx.parent_value.downcast_ref::<Json>();
        let args = collect_args(ctx)?;
        let request = ctx.ctx.data_opt::<RequestContext>();
        let input = super::ResolveInput {
            parent,
            args: &args,
            request,
        };

        let resolved = match &self.field.resolver {
            Some(resolver) => resolver(&input),
            None => Ok(input.parent_field(&self.field.name).cloned()),
        };

        let value = match self.mock {
            None => resolved?,
            // Concrete results win; everything else is synthesized
            Some(mock) => match resolved {
                Ok(Some(value)) if !value.is_null() => Some(value),
                _ => Some(mock.synthesize(&self.field.shape, &self.objects)),
            },
        };

        match value {
            None | Some(Json::Null) => Ok(None),
            Some(value) => to_field_value(&self.field.shape, &self.objects, value).map(Some),
        }
    }
}

fn collect_args(ctx: &ResolverContext<'_>) -> async_graphql::Result<Map<String, Json>> {
    let mut args = Map::new();
    for (name, value) in ctx.args.iter() {
        args.insert(name.to_string(), value.as_value().clone().into_json()?);
    }
    Ok(args)
}

/// Shape a JSON value into what the schema expects for `shape`.
fn to_field_value<'a>(
    shape: &TypeShape,
    objects: &HashSet<String>,
    value: Json,
) -> async_graphql::Result<FieldValue<'a>> {
    match shape {
        TypeShape::List { item, .. } => match value {
            Json::Array(items) => {
                let items = items
                    .into_iter()
                    .map(|item_value| {
                        if item_value.is_null() {
                            Ok(FieldValue::NULL)
                        } else {
                            to_field_value(item, objects, item_value)
                        }
                    })
                    .collect::<async_graphql::Result<Vec<_>>>()?;
                Ok(FieldValue::list(items))
            }
            other => Err(async_graphql::Error::new(format!(
                "expected a list for {}, got {}",
                shape, other
            ))),
        },
        TypeShape::Named { name, .. } if objects.contains(name) => {
            if value.is_object() {
                Ok(FieldValue::owned_any(value))
            } else {
                Err(async_graphql::Error::new(format!(
                    "expected an object for {}, got {}",
                    name, value
                )))
            }
        }
        TypeShape::Named { .. } => Ok(FieldValue::value(ConstValue::from_json(value)?)),
    }
}

/// One subscription field's event pipeline
struct StreamPlan {
    subgraph: String,
    field: String,
    shape: TypeShape,
    objects: Arc<HashSet<String>>,
    source: EventStreamSource,
    identity: ProcessIdentity,
    metrics: Arc<GatewayMetrics>,
}

impl StreamPlan {
    /// Start an independent event sequence for one subscription operation.
    ///
    /// Cancellation follows the owning connection when there is one.
    fn open<'a>(
        self: Arc<Self>,
        scope: Option<ConnectionScope>,
    ) -> BoxStream<'a, async_graphql::Result<FieldValue<'a>>> {
        let token = scope
            .as_ref()
            .map(|s| s.token().child_token())
            .unwrap_or_else(CancellationToken::new);
        let connection_id = scope.map(|s| s.id().to_string()).unwrap_or_default();

        info!(
            subgraph = %self.subgraph,
            field = %self.field,
            host = %self.identity,
            connection_id = %connection_id,
            "Subscription stream established"
        );

        let guard = SubscriptionGuard::new(Arc::clone(&self.metrics));
        let events = self.source.produce(token);
        let plan = Arc::clone(&self);

        events
            .map(move |event| -> async_graphql::Result<FieldValue<'a>> {
                let _active = &guard;
                plan.metrics.record_stream_event();
                debug!(
                    subgraph = %plan.subgraph,
                    field = %plan.field,
                    host = %plan.identity,
                    position = event.position,
                    "Sending event"
                );
                to_field_value(&plan.shape, &plan.objects, event.payload)
            })
            .boxed()
    }
}
