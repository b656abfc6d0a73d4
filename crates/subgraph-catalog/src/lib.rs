//! # Subgraph Catalog
//!
//! The subgraphs served by `subgraph-host`:
//!
//! | name       | streaming | mockable |
//! |------------|-----------|----------|
//! | `products` | no        | yes      |
//! | `reviews`  | yes       | yes      |
//! | `users`    | no        | no       |
//!
//! Every module exposes a `schema()` supplier over in-memory data.

pub mod products;
pub mod reviews;
pub mod users;

use subgraph_gateway::SubgraphDescriptor;
use tracing::warn;

/// Subgraphs that always serve their authored resolvers
pub const NEVER_MOCKED: [&str; 1] = [users::NAME];

/// All local subgraphs, authored.
pub fn local_subgraphs() -> Vec<SubgraphDescriptor> {
    vec![
        SubgraphDescriptor::new(products::NAME, products::schema),
        SubgraphDescriptor::new(reviews::NAME, reviews::schema).with_streaming(),
        SubgraphDescriptor::new(users::NAME, users::schema),
    ]
}

/// All local subgraphs, with the named ones switched to mocked data.
///
/// Names in [`NEVER_MOCKED`] stay authored; unknown names are ignored. Both
/// cases are logged.
pub fn local_subgraphs_with_mocks<S: AsRef<str>>(mocked: &[S]) -> Vec<SubgraphDescriptor> {
    let all = local_subgraphs();

    for name in mocked.iter().map(AsRef::as_ref) {
        if NEVER_MOCKED.contains(&name) {
            warn!(subgraph = %name, "Mocking requested for a subgraph that is never mocked");
        } else if !all.iter().any(|d| d.name() == name) {
            warn!(subgraph = %name, "Mocking requested for an unknown subgraph");
        }
    }

    all.into_iter()
        .map(|descriptor| {
            let name = descriptor.name();
            let wanted = mocked.iter().any(|m| m.as_ref() == name);
            if wanted && !NEVER_MOCKED.contains(&name) {
                descriptor.mocked()
            } else {
                descriptor
            }
        })
        .collect()
}
