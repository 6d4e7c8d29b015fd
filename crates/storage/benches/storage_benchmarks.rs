#![allow(clippy::expect_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tokio::runtime::Runtime;
use twinpath_storage::{MemoryRecoveryStore, RecoveryKey, RecoveryStore, SignedToken};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rt() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime")
}

fn make_token(idx: usize) -> SignedToken {
    // Roughly the size of a real HS256 identity token.
    SignedToken::from(format!("{:0>36}.{idx:0>80}.{:0>43}", "h", "s"))
}

/// Creates a store pre-populated with `count` bindings, returning the keys.
fn populated_store(rt: &Runtime, count: usize) -> (MemoryRecoveryStore, Vec<RecoveryKey>) {
    rt.block_on(async {
        let store = MemoryRecoveryStore::new();
        let mut keys = Vec::with_capacity(count);
        for i in 0..count {
            keys.push(store.put(make_token(i)).await.expect("populate put failed"));
        }
        (store, keys)
    })
}

// ---------------------------------------------------------------------------
// put / get
// ---------------------------------------------------------------------------

fn put_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_operations");
    let rt = rt();

    for &existing in &[0usize, 10_000, 100_000] {
        let (store, _) = populated_store(&rt, existing);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("put", existing), &existing, |b, _| {
            b.iter(|| rt.block_on(store.put(make_token(0))).expect("put failed"));
        });
    }

    group.finish();
}

fn get_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_operations");
    let rt = rt();

    for &existing in &[1usize, 10_000, 100_000] {
        let (store, keys) = populated_store(&rt, existing);
        let key = keys[existing / 2].clone();
        group.bench_with_input(BenchmarkId::new("hit", existing), &existing, |b, _| {
            b.iter(|| rt.block_on(store.get(&key)).expect("get failed"));
        });

        let missing = RecoveryKey::generate();
        group.bench_with_input(BenchmarkId::new("miss", existing), &existing, |b, _| {
            b.iter(|| rt.block_on(store.get(&missing)).expect("get failed"));
        });
    }

    group.finish();
}

criterion_group!(benches, put_operations, get_operations);
criterion_main!(benches);
