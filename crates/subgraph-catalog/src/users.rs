//! `users` subgraph.
//!
//! Always served authored: `user(id)` reports unknown ids as an error, which
//! mocked data would hide.

use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value as Json};
use std::sync::Arc;
use subgraph_gateway::{
    FieldDef, ObjectDef, ResolveError, SchemaBuildError, SchemaDefinition, TypeShape,
};

pub const NAME: &str = "users";

/// Upper bound (exclusive) for the generated loyalty points
pub const MAX_LOYALTY_POINTS: i64 = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Currency {
    iso_code: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct User {
    id: &'static str,
    username: &'static str,
    shipping_address: &'static str,
    currency: Currency,
}

const USERS: [User; 3] = [
    User {
        id: "user:1",
        username: "User One",
        shipping_address: "123 Main St",
        currency: Currency { iso_code: "USD" },
    },
    User {
        id: "user:2",
        username: "User Two",
        shipping_address: "123 Main St",
        currency: Currency { iso_code: "CAN" },
    },
    User {
        id: "user:3",
        username: "User Three",
        shipping_address: "123 Main St",
        currency: Currency { iso_code: "CAN" },
    },
];

/// Authored schema supplier
pub fn schema() -> Result<SchemaDefinition, SchemaBuildError> {
    let users: Arc<Vec<Json>> = Arc::new(
        USERS
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .map_err(|e| SchemaBuildError::Supplier(e.to_string()))?,
    );
    let by_id = Arc::clone(&users);
    let all = Arc::clone(&users);

    Ok(SchemaDefinition::new()
        .query_field(
            FieldDef::new("user", TypeShape::named("User"))
                .argument("id", TypeShape::named_nn("ID"))
                .resolve(move |input| {
                    let id = input.arg_str("id").unwrap_or_default();
                    by_id
                        .iter()
                        .find(|u| u.get("id").and_then(Json::as_str) == Some(id))
                        .cloned()
                        .map(Some)
                        .ok_or_else(|| ResolveError::new(format!("Could not locate user by id: {}", id)))
                }),
        )
        .query_field(
            FieldDef::new("allUsers", TypeShape::list(TypeShape::named("User")))
                .resolve(move |_| Ok(Some(Json::Array(all.as_ref().clone())))),
        )
        .object(
            ObjectDef::new("User")
                .field(FieldDef::new("id", TypeShape::named_nn("ID")))
                .field(FieldDef::new("username", TypeShape::named("String")))
                .field(FieldDef::new("shippingAddress", TypeShape::named("String")))
                .field(FieldDef::new("currency", TypeShape::named("Currency")))
                .field(
                    FieldDef::new("loyaltyPoints", TypeShape::named("Int")).resolve(|_| {
                        let points = rand::thread_rng().gen_range(0..MAX_LOYALTY_POINTS);
                        Ok(Some(json!(points)))
                    }),
                ),
        )
        .object(
            ObjectDef::new("Currency").field(FieldDef::new("isoCode", TypeShape::named("String"))),
        ))
}
