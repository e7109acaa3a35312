//! # Commit Benchmarks
//!
//! Throughput of case population and relational commits.
//!
//! Run with: `cargo bench -p hivecase-core`

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use hivecase_core::{CaseContext, FileId, KeyValue, RelationalStore, TreeNode};
use std::hint::black_box;
use tempfile::tempdir;

/// Populate a case with `keys` keys spread over a fixed fan-out, one value each.
fn populate(keys: usize) -> CaseContext {
    let mut case = CaseContext::new("/bench/case");
    let file = case.allocate_file();
    for i in 0..keys {
        let path = [
            "ControlSet001".to_string(),
            format!("Services{}", i % 16),
            format!("Instance{}", i),
        ];
        let node = case.insert_key(&path).expect("key");
        let raw = (i as u32).to_le_bytes();
        case.insert_value(node, "Start", &raw, &i.to_string(), "REG_DWORD", file)
            .expect("value");
    }
    case
}

/// Attribute rows for every value the case knows about.
fn attribute_rows(case: &CaseContext) -> Vec<KeyValue> {
    case.values()
        .entries()
        .map(|(key, id)| KeyValue {
            id,
            node: key.node,
            file: FileId(1),
            raw: key.raw,
            ascii: key.ascii,
            type_tag: key.type_tag.clone(),
        })
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_populate(c: &mut Criterion) {
    let mut group = c.benchmark_group("populate");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(populate(size)));
        });
    }

    group.finish();
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");
    group.sample_size(10);

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || {
                    let dir = tempdir().expect("temp dir");
                    let store = RelationalStore::create_schema(dir.path()).expect("schema");
                    let case = populate(size);
                    let edges: Vec<TreeNode> = case.tree().pending_edges().collect();
                    (dir, store, edges, attribute_rows(&case))
                },
                |(dir, store, edges, rows)| {
                    store.commit_tree_edges(&edges).expect("edges");
                    store.commit_attributes(&rows).expect("rows");
                    black_box(dir)
                },
                BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

fn bench_recommit(c: &mut Criterion) {
    let dir = tempdir().expect("temp dir");
    let store = RelationalStore::create_schema(dir.path()).expect("schema");
    let case = populate(1000);
    let edges: Vec<TreeNode> = case.tree().pending_edges().collect();
    store.commit_tree_edges(&edges).expect("seed");

    c.bench_function("recommit_1000_duplicate_edges", |b| {
        b.iter(|| black_box(store.commit_tree_edges(&edges).expect("recommit")));
    });
}

criterion_group!(benches, bench_populate, bench_commit, bench_recommit);
criterion_main!(benches);
