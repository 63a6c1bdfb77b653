//! Performance benchmarks for nodepath core operations
//!
//! Run with: `cargo bench -p nodepath-core`
//!
//! These benchmarks measure critical path performance:
//! - Child creation (path computed from the parent, no cascade)
//! - Subtree cascade (rename of a node with many descendants)
//! - Descendant / ancestor queries served by the path index

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nodepath_core::{CreateNodeParams, Node, TreeConfig, TreeService};
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Setup a test service with a fresh database
async fn setup_test_service() -> (TreeService, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = TreeConfig::with_database_path(temp_dir.path().join("bench.db"));
    let service = TreeService::open(&config).await.unwrap();
    (service, temp_dir)
}

/// Build a tree of `fanout^depth` leaves below a single root
///
/// Returns the root and the deepest node created last.
async fn build_tree(service: &TreeService, fanout: usize, depth: usize) -> (Node, Node) {
    let root = service
        .create_node(CreateNodeParams::root("root", "Root"))
        .await
        .unwrap();

    let mut level = vec![root.clone()];
    let mut last = root.clone();
    for d in 0..depth {
        let mut next = Vec::with_capacity(level.len() * fanout);
        for (p, parent) in level.iter().enumerate() {
            for f in 0..fanout {
                let key = format!("n{}_{}_{}", d, p, f);
                last = service
                    .create_node(CreateNodeParams::child(&key, &key, &parent.id))
                    .await
                    .unwrap();
                next.push(last.clone());
            }
        }
        level = next;
    }

    (root, last)
}

/// Benchmark child creation
///
/// Target: < 5ms per insert (one transaction each)
fn bench_create_child(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("create_child_node", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (service, _temp) = setup_test_service().await;
                let parent = service
                    .create_node(CreateNodeParams::root("parent", "Parent"))
                    .await
                    .unwrap();

                let start = std::time::Instant::now();
                for i in 0..iters {
                    let key = format!("child_{}", i);
                    black_box(
                        service
                            .create_node(CreateNodeParams::child(&key, "", &parent.id))
                            .await
                            .unwrap(),
                    );
                }
                start.elapsed()
            })
        });
    });
}

/// Benchmark the subtree cascade
///
/// Renames the root back and forth; every rename rewrites all descendants
/// in one statement.
fn bench_cascade_rename(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("cascade_rename");
    group.sample_size(10); // Fewer samples for expensive operations

    for (fanout, depth) in [(5usize, 3usize), (10, 3)] {
        let descendants: usize = (1..=depth).map(|d| fanout.pow(d as u32)).sum();

        group.bench_with_input(
            BenchmarkId::from_parameter(descendants),
            &(fanout, depth),
            |b, &(fanout, depth)| {
                b.iter_custom(|iters| {
                    rt.block_on(async {
                        let (service, _temp) = setup_test_service().await;
                        let (root, _) = build_tree(&service, fanout, depth).await;

                        let start = std::time::Instant::now();
                        for i in 0..iters {
                            let key = if i % 2 == 0 { "renamed" } else { "root" };
                            black_box(service.rename_node(&root.id, key).await.unwrap());
                        }
                        start.elapsed()
                    })
                });
            },
        );
    }

    group.finish();
}

/// Benchmark containment queries
///
/// Target: descendants of a 1110-node subtree < 10ms
fn bench_containment_queries(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (service, _temp, root, leaf) = rt.block_on(async {
        let (service, temp) = setup_test_service().await;
        let (root, leaf) = build_tree(&service, 10, 3).await;
        (service, temp, root, leaf)
    });

    c.bench_function("descendants_of_root", |b| {
        b.iter(|| rt.block_on(async { black_box(service.descendants(&root.id).await.unwrap()) }));
    });

    c.bench_function("ancestors_of_leaf", |b| {
        b.iter(|| rt.block_on(async { black_box(service.ancestors(&leaf.id).await.unwrap()) }));
    });
}

criterion_group!(
    benches,
    bench_create_child,
    bench_cascade_rename,
    bench_containment_queries
);
criterion_main!(benches);
