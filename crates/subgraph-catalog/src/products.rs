//! `products` subgraph: a small fixed inventory.

use serde::Serialize;
use serde_json::Value as Json;
use std::sync::Arc;
use subgraph_gateway::{FieldDef, ObjectDef, SchemaBuildError, SchemaDefinition, TypeShape};

pub const NAME: &str = "products";

/// Results returned by `topProducts` when `first` is omitted
const DEFAULT_TOP: i64 = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Product {
    upc: &'static str,
    name: &'static str,
    price: i64,
    weight: i64,
    in_stock: bool,
}

const PRODUCTS: [Product; 3] = [
    Product {
        upc: "1",
        name: "Table",
        price: 899,
        weight: 100,
        in_stock: true,
    },
    Product {
        upc: "2",
        name: "Couch",
        price: 1299,
        weight: 1000,
        in_stock: false,
    },
    Product {
        upc: "3",
        name: "Chair",
        price: 54,
        weight: 50,
        in_stock: true,
    },
];

/// Authored schema supplier
pub fn schema() -> Result<SchemaDefinition, SchemaBuildError> {
    let products: Arc<Vec<Json>> = Arc::new(
        PRODUCTS
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .map_err(|e| SchemaBuildError::Supplier(e.to_string()))?,
    );
    let top = Arc::clone(&products);
    let by_upc = Arc::clone(&products);

    Ok(SchemaDefinition::new()
        .query_field(
            FieldDef::new("topProducts", TypeShape::list(TypeShape::named("Product")))
                .argument("first", TypeShape::named("Int"))
                .describe("First `first` products of the catalog (default 5)")
                .resolve(move |input| {
                    let first = input.arg_i64("first").unwrap_or(DEFAULT_TOP).max(0) as usize;
                    Ok(Some(Json::Array(top.iter().take(first).cloned().collect())))
                }),
        )
        .query_field(
            FieldDef::new("product", TypeShape::named("Product"))
                .argument("upc", TypeShape::named_nn("String"))
                .resolve(move |input| {
                    let upc = input.arg_str("upc");
                    Ok(by_upc
                        .iter()
                        .find(|p| p.get("upc").and_then(Json::as_str) == upc)
                        .cloned())
                }),
        )
        .object(
            ObjectDef::new("Product")
                .field(FieldDef::new("upc", TypeShape::named_nn("String")))
                .field(FieldDef::new("name", TypeShape::named("String")))
                .field(FieldDef::new("price", TypeShape::named("Int")))
                .field(FieldDef::new("weight", TypeShape::named("Int")))
                .field(FieldDef::new("inStock", TypeShape::named("Boolean"))),
        ))
}
