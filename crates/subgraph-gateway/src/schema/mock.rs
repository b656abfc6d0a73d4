//! Synthetic values for mocked subgraphs.
//!
//! The generator only ever produces values; it never touches the schema
//! shape. Objects come out as empty JSON objects so that every nested field
//! falls through to the generator again.

use super::definition::TypeShape;
use async_graphql::dynamic::TypeRef;
use rand::Rng;
use serde_json::{json, Value as Json};
use std::collections::HashSet;

/// Items generated for a list-typed field
pub const MOCK_LIST_LEN: usize = 2;

/// Produces placeholder values matching a [`TypeShape`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MockGenerator;

impl MockGenerator {
    pub fn new() -> Self {
        Self
    }

    /// A non-null value of the given shape.
    ///
    /// `objects` holds the names of object types; anything else is treated as
    /// a scalar.
    pub fn synthesize(&self, shape: &TypeShape, objects: &HashSet<String>) -> Json {
        match shape {
            TypeShape::List { item, .. } => Json::Array(
                (0..MOCK_LIST_LEN)
                    .map(|_| self.synthesize(item, objects))
                    .collect(),
            ),
            TypeShape::Named { name, .. } if objects.contains(name) => json!({}),
            TypeShape::Named { name, .. } => self.scalar(name),
        }
    }

    fn scalar(&self, name: &str) -> Json {
        let mut rng = rand::thread_rng();
        match name {
            TypeRef::INT => json!(rng.gen_range(-100..=100)),
            TypeRef::FLOAT => json!(rng.gen_range(-100.0..=100.0)),
            TypeRef::BOOLEAN => json!(rng.gen::<bool>()),
            TypeRef::ID => json!(uuid::Uuid::new_v4().to_string()),
            _ => json!("Hello World"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objects() -> HashSet<String> {
        ["Product".to_string()].into_iter().collect()
    }

    #[test]
    fn test_scalars_match_their_type() {
        let mock = MockGenerator::new();
        let objects = objects();
        assert_eq!(mock.synthesize(&TypeShape::named("String"), &objects), json!("Hello World"));
        assert!(mock.synthesize(&TypeShape::named_nn("Int"), &objects).is_i64());
        assert!(mock.synthesize(&TypeShape::named("Float"), &objects).is_f64());
        assert!(mock.synthesize(&TypeShape::named("Boolean"), &objects).is_boolean());
        let id = mock.synthesize(&TypeShape::named_nn("ID"), &objects);
        assert!(uuid::Uuid::parse_str(id.as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_ints_stay_in_range() {
        let mock = MockGenerator::new();
        for _ in 0..200 {
            let value = mock.synthesize(&TypeShape::named("Int"), &objects());
            let n = value.as_i64().unwrap();
            assert!((-100..=100).contains(&n));
        }
    }

    #[test]
    fn test_objects_and_lists() {
        let mock = MockGenerator::new();
        let shape = TypeShape::list(TypeShape::named_nn("Product"));
        assert_eq!(mock.synthesize(&shape, &objects()), json!([{}, {}]));
    }
}
