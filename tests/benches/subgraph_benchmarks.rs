//! # Subgraph Host Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Provisioning | build authored and mocked schemas for every catalog subgraph |
//! | Query engine | execute a representative query per subgraph |
//! | Event stream | advance a cursor through the review catalog |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use subgraph_catalog::local_subgraphs;
use subgraph_gateway::{EventCatalog, GatewayMetrics, ProcessIdentity, SchemaProvider};

fn provider() -> SchemaProvider {
    SchemaProvider::new(
        ProcessIdentity::new("bench"),
        Duration::from_secs(3),
        true,
        Arc::new(GatewayMetrics::new()),
    )
}

// ============================================================================
// Provisioning
// ============================================================================

fn bench_schema_provisioning(c: &mut Criterion) {
    let mut group = c.benchmark_group("provisioning");
    let provider = provider();

    for descriptor in local_subgraphs() {
        group.bench_with_input(
            BenchmarkId::new("authored", descriptor.name()),
            &descriptor,
            |b, descriptor| b.iter(|| black_box(provider.provide(descriptor).is_ok())),
        );

        let mocked = descriptor.clone().mocked();
        group.bench_with_input(
            BenchmarkId::new("mocked", descriptor.name()),
            &mocked,
            |b, descriptor| b.iter(|| black_box(provider.provide(descriptor).is_ok())),
        );
    }

    group.finish();
}

// ============================================================================
// Query execution
// ============================================================================

fn bench_query_execution(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let provider = provider();
    let queries = [
        ("products", "{ topProducts(first: 3) { upc name price weight inStock } }"),
        ("reviews", "{ reviews { id title product { upc } } }"),
        ("users", r#"{ user(id: "user:1") { username currency { isoCode } loyaltyPoints } }"#),
    ];

    let mut group = c.benchmark_group("query");
    for descriptor in local_subgraphs() {
        let Some((_, query)) = queries.iter().find(|(name, _)| *name == descriptor.name()) else {
            continue;
        };
        let provided = provider.provide(&descriptor).unwrap();

        group.bench_function(descriptor.name(), |b| {
            b.to_async(&runtime).iter(|| async {
                let response = provided.schema.execute(*query).await;
                black_box(response.errors.is_empty())
            })
        });
    }
    group.finish();
}

// ============================================================================
// Event stream
// ============================================================================

fn bench_event_cursor(c: &mut Criterion) {
    let mut group = c.benchmark_group("event-cursor");

    for size in [3usize, 100, 10_000] {
        let catalog =
            EventCatalog::new("bench", (0..size).map(|i| json!({ "id": i })).collect()).unwrap();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("full_cycle", size), &catalog, |b, catalog| {
            b.iter(|| {
                let mut cursor = catalog.cursor();
                for _ in 0..catalog.len() {
                    black_box(cursor.advance());
                }
                cursor.position()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_schema_provisioning,
    bench_query_execution,
    bench_event_cursor
);
criterion_main!(benches);
