//! Benchmarks for admission control

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sentinel_core::{AdmissionController, RateLimitConfig};
use sentinel_store::MemoryRateLimitStore;
use std::sync::Arc;

fn bench_is_allowed(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = RateLimitConfig {
        max_tokens: u32::MAX,
        tokens_per_interval: u32::MAX,
        ..Default::default()
    };

    let mut group = c.benchmark_group("admission");

    let local = AdmissionController::local_only(RateLimitConfig {
        window_ttl_ms: 1,
        ..config.clone()
    });
    let distributed = AdmissionController::new(config, Some(Arc::new(MemoryRateLimitStore::new())));

    for (name, controller) in [("local", &local), ("distributed", &distributed)] {
        group.bench_with_input(BenchmarkId::new("is_allowed", name), controller, |b, controller| {
            let mut now = 1_700_000_000_000i64;
            b.iter(|| {
                now += 1;
                rt.block_on(async { black_box(controller.is_allowed_at("/orders", now).await) })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_is_allowed);
criterion_main!(benches);
