use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use store::{Options, Store};
use tempfile::tempdir;

const N_KEYS: usize = 10_000;
const VALUE_SIZE: usize = 100;

fn filled_store(dir: &std::path::Path, cache_size: usize) -> Store {
    let mut store = Store::open(
        dir.join("bench.log"),
        Options {
            cache_size,
            ..Options::default()
        },
    )
    .unwrap();
    for i in 0..N_KEYS {
        store
            .put(&format!("key{}", i), &vec![b'x'; VALUE_SIZE])
            .unwrap();
    }
    store
}

fn put_benchmark(c: &mut Criterion) {
    c.bench_function("store_put_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let store = Store::open(dir.path().join("bench.log"), Options::default()).unwrap();
                (dir, store)
            },
            |(_dir, mut store)| {
                for i in 0..N_KEYS {
                    store
                        .put(&format!("key{}", i), &vec![b'x'; VALUE_SIZE])
                        .unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn get_cached_benchmark(c: &mut Criterion) {
    c.bench_function("store_get_cached_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                // cache holds the full working set
                let store = filled_store(dir.path(), N_KEYS);
                (dir, store)
            },
            |(_dir, mut store)| {
                for i in 0..N_KEYS {
                    let v = store.get(&format!("key{}", i)).unwrap();
                    assert!(v.is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn get_mapped_benchmark(c: &mut Criterion) {
    c.bench_function("store_get_mapped_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                // tiny cache: almost every get reads the mapped log
                let store = filled_store(dir.path(), 16);
                (dir, store)
            },
            |(_dir, mut store)| {
                for i in 0..N_KEYS {
                    let v = store.get(&format!("key{}", i)).unwrap();
                    assert!(v.is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn recover_benchmark(c: &mut Criterion) {
    c.bench_function("store_recover_10k_scan", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                drop(filled_store(dir.path(), 16));
                let store = Store::open(dir.path().join("bench.log"), Options::default()).unwrap();
                (dir, store)
            },
            |(_dir, mut store)| {
                store.recover().unwrap();
                assert_eq!(store.len(), N_KEYS);
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    put_benchmark,
    get_cached_benchmark,
    get_mapped_benchmark,
    recover_benchmark
);
criterion_main!(benches);
