//! `reviews` subgraph: reviews per product, plus the `reviewAdded` stream.
//!
//! The stream replays the review list in order, forever, one review per
//! event interval.

use serde::Serialize;
use serde_json::{json, Value as Json};
use std::sync::Arc;
use subgraph_gateway::{
    EventCatalog, FieldDef, ObjectDef, SchemaBuildError, SchemaDefinition, StreamFieldDef,
    TypeShape,
};

pub const NAME: &str = "reviews";

/// Subscription field fed by the review catalog
pub const REVIEW_ADDED: &str = "reviewAdded";

#[derive(Debug, Clone, Serialize)]
struct ProductRef {
    upc: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct Review {
    id: &'static str,
    title: &'static str,
    body: &'static str,
    product: ProductRef,
}

const REVIEWS: [Review; 3] = [
    Review {
        id: "review:1",
        title: "Sturdy",
        body: "Love it! Survived two moves without a wobble.",
        product: ProductRef { upc: "1" },
    },
    Review {
        id: "review:2",
        title: "Too heavy",
        body: "Could not get it up the stairs on my own.",
        product: ProductRef { upc: "2" },
    },
    Review {
        id: "review:3",
        title: "Comfortable",
        body: "Good lumbar support for the price.",
        product: ProductRef { upc: "3" },
    },
];

fn reviews() -> Result<Vec<Json>, SchemaBuildError> {
    REVIEWS
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()
        .map_err(|e| SchemaBuildError::Supplier(e.to_string()))
}

/// Authored schema supplier
pub fn schema() -> Result<SchemaDefinition, SchemaBuildError> {
    let all = Arc::new(reviews()?);
    let catalog = EventCatalog::new(REVIEW_ADDED, all.as_ref().clone())?;

    let by_id = Arc::clone(&all);
    let listed = Arc::clone(&all);
    let by_product = Arc::clone(&all);

    Ok(SchemaDefinition::new()
        .query_field(
            FieldDef::new("review", TypeShape::named("Review"))
                .argument("id", TypeShape::named_nn("ID"))
                .resolve(move |input| {
                    let id = input.arg_str("id");
                    Ok(by_id
                        .iter()
                        .find(|r| r.get("id").and_then(Json::as_str) == id)
                        .cloned())
                }),
        )
        .query_field(
            FieldDef::new(
                "reviews",
                TypeShape::list(TypeShape::named_nn("Review")).non_null(),
            )
            .resolve(move |_| Ok(Some(Json::Array(listed.as_ref().clone())))),
        )
        .query_field(
            FieldDef::new("product", TypeShape::named("Product"))
                .argument("upc", TypeShape::named_nn("String"))
                .describe("Entry point to a product's reviews")
                .resolve(|input| Ok(input.arg_str("upc").map(|upc| json!({ "upc": upc })))),
        )
        .object(
            ObjectDef::new("Review")
                .field(FieldDef::new("id", TypeShape::named_nn("ID")))
                .field(FieldDef::new("title", TypeShape::named("String")))
                .field(FieldDef::new("body", TypeShape::named("String")))
                .field(FieldDef::new("product", TypeShape::named("Product"))),
        )
        .object(
            ObjectDef::new("Product")
                .field(FieldDef::new("upc", TypeShape::named_nn("String")))
                .field(
                    FieldDef::new("reviews", TypeShape::list(TypeShape::named("Review")))
                        .resolve(move |input| {
                            let upc = input.parent_field("upc").and_then(Json::as_str);
                            Ok(Some(Json::Array(
                                by_product
                                    .iter()
                                    .filter(|r| {
                                        r.pointer("/product/upc").and_then(Json::as_str) == upc
                                    })
                                    .cloned()
                                    .collect(),
                            )))
                        }),
                ),
        )
        .subscription_field(StreamFieldDef::new(
            REVIEW_ADDED,
            TypeShape::named("Review"),
            catalog,
        )))
}
