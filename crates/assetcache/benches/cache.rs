use std::sync::Arc;

use assetcache::{AssetManager, CacheConfig, LoadQueue, MemorySource};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn populated_source(count: usize) -> (Arc<MemorySource>, Vec<String>) {
    let source = MemorySource::new();
    let data = vec![b'x'; 1024];
    let ids: Vec<String> = (0..count).map(|i| format!("asset-{}.bin", i)).collect();
    for id in &ids {
        source.insert(id.as_str(), data.clone());
    }
    (Arc::new(source), ids)
}

fn bench_cached_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_request");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("request_1kb_hit", |b| {
        let (source, ids) = populated_source(100);
        let manager = AssetManager::new(CacheConfig::with_capacity(1000), source).unwrap();

        // Warm the cache
        for id in &ids {
            manager.request_asset(id).unwrap();
        }

        let mut counter = 0;
        b.iter(|| {
            black_box(manager.request_asset(&ids[counter % 100]).unwrap());
            counter += 1;
        });
    });

    group.finish();
}

fn bench_mixed_request_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("50_request_50_release", |b| {
        let (source, ids) = populated_source(100);
        let manager = AssetManager::new(CacheConfig::with_capacity(1000), source).unwrap();

        let mut counter = 0usize;
        b.iter(|| {
            let id = &ids[counter % 100];
            if counter % 2 == 0 {
                black_box(manager.request_asset(id).ok());
            } else {
                manager.release_asset(id);
            }
            counter += 1;
        });
    });

    group.finish();
}

fn bench_request_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_miss");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("request_1kb_miss_with_eviction", |b| {
        let (source, ids) = populated_source(100);
        let manager = AssetManager::new(CacheConfig::with_capacity(10), source).unwrap();

        let mut counter = 0;
        b.iter(|| {
            // Cycling through more IDs than fit guarantees misses
            black_box(manager.request_asset(&ids[counter % 100]).unwrap());
            counter += 1;
        });
    });

    group.finish();
}

fn bench_load_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_queue");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1000));

    group.bench_function("enqueue_drain_1000", |b| {
        let queue = LoadQueue::new();
        b.iter(|| {
            for i in 0..1000u32 {
                queue.enqueue(i, i % 16);
            }
            black_box(queue.drain());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_cached_request,
    bench_mixed_request_release,
    bench_request_miss,
    bench_load_queue
);
criterion_main!(benches);
