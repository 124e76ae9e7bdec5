//! Benchmarks for basic cache operations: L1 hit, L2 hit (L1 miss),
//! full miss, and read-through with a loader, across a few payload
//! sizes. Requires a reachable Redis at `REDIS_URL`.

use cachebroker::{BrokerConfig, CacheManager};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

fn setup() -> (Arc<CacheManager>, Runtime) {
    let rt = Runtime::new().unwrap_or_else(|_| panic!("failed to create runtime"));
    let manager = rt.block_on(async {
        let mut config = BrokerConfig::default();
        config.redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        CacheManager::init(config, None)
            .await
            .unwrap_or_else(|_| panic!("failed to init cache manager"))
    });
    (manager, rt)
}

fn payload(size_bytes: usize) -> Value {
    json!({"data": "x".repeat(size_bytes), "size": size_bytes})
}

fn bench_put(c: &mut Criterion) {
    let (manager, rt) = setup();
    let mut group = c.benchmark_group("put");

    for size in &[100usize, 1024, 10_240] {
        let data = payload(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let key = format!("bench:{}", rand::random::<u32>());
                    manager
                        .put("bench", &key, black_box(&data))
                        .await
                        .unwrap_or_else(|_| panic!("put failed"));
                });
            });
        });
    }
    group.finish();
}

fn bench_l1_hit(c: &mut Criterion) {
    let (manager, rt) = setup();
    rt.block_on(async {
        for i in 0..100 {
            let key = format!("bench:l1:{i}");
            manager.put("bench", &key, &payload(1024)).await.unwrap();
            let _: Option<Value> = manager.get("bench", &key).await.unwrap();
        }
    });

    c.bench_function("l1_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let key = format!("bench:l1:{}", rand::random::<u8>() % 100);
                let value: Option<Value> = manager.get("bench", &key).await.unwrap();
                black_box(value);
            });
        });
    });
}

fn bench_l2_hit(c: &mut Criterion) {
    let (manager, rt) = setup();
    rt.block_on(async {
        for i in 0..100 {
            let key = format!("bench:l2:{i}");
            manager.put("bench", &key, &payload(1024)).await.unwrap();
        }
    });

    c.bench_function("l2_hit_l1_miss", |b| {
        b.iter(|| {
            rt.block_on(async {
                let key = format!("bench:l2:{}", rand::random::<u8>() % 100);
                manager.evict("bench", &[key.clone()]).await.unwrap();
                let value: Option<Value> = manager.get("bench", &key).await.unwrap();
                black_box(value);
            });
        });
    });
}

fn bench_miss(c: &mut Criterion) {
    let (manager, rt) = setup();
    c.bench_function("full_miss", |b| {
        b.iter(|| {
            rt.block_on(async {
                let key = format!("bench:miss:{}", rand::random::<u32>());
                let value: Option<Value> = manager.get("bench", &key).await.unwrap();
                black_box(value);
            });
        });
    });
}

fn bench_get_with_loader(c: &mut Criterion) {
    let (manager, rt) = setup();
    let mut group = c.benchmark_group("get_with_loader");

    for delay_ms in &[0u64, 5] {
        let delay = Duration::from_millis(*delay_ms);
        group.bench_with_input(BenchmarkId::from_parameter(delay_ms), delay_ms, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let key = format!("bench:loader:{}", rand::random::<u32>());
                    let value: Value = manager
                        .get_with_loader("bench", &key, || async move {
                            tokio::time::sleep(delay).await;
                            Ok(payload(1024))
                        })
                        .await
                        .unwrap();
                    black_box(value);
                });
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_put,
    bench_l1_hit,
    bench_l2_hit,
    bench_miss,
    bench_get_with_loader
);
criterion_main!(benches);
