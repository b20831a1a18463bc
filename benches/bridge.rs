//! Benchmarks for metrics-bridge components.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use metrics_bridge::bridge::Serializer;
use metrics_bridge::registry::{Histogram, Registry};
use std::time::Duration;

fn populated_registry(per_kind: usize) -> Registry {
    let registry = Registry::new();
    for i in 0..per_kind {
        registry
            .get_or_register_counter(&format!("counter.{}", i))
            .unwrap()
            .inc(i as i64);
        registry
            .get_or_register_gauge(&format!("gauge.{}", i))
            .unwrap()
            .update(i as i64);

        let timer = registry.get_or_register_timer(&format!("timer.{}", i)).unwrap();
        for ms in 0..100 {
            timer.update(Duration::from_micros(ms * 37));
        }
    }
    registry
}

fn benchmark_serialize(c: &mut Criterion) {
    let registry = populated_registry(50);
    let serializer = Serializer::new("bench", "bench-host");

    let mut group = c.benchmark_group("serialize");
    group.throughput(Throughput::Elements(registry.len() as u64));

    group.bench_function("records", |b| {
        b.iter(|| black_box(serializer.serialize(&registry)));
    });

    group.bench_function("json", |b| {
        b.iter(|| black_box(serializer.to_json(&registry).unwrap()));
    });

    group.finish();
}

fn benchmark_histogram_update(c: &mut Criterion) {
    let histogram = Histogram::new();
    let mut value = 0i64;

    c.bench_function("histogram_update", |b| {
        b.iter(|| {
            value = (value + 7919) % 1_000_000;
            histogram.update(black_box(value));
        })
    });
}

fn benchmark_get_or_register(c: &mut Criterion) {
    let registry = populated_registry(50);

    c.bench_function("get_or_register_existing", |b| {
        b.iter(|| black_box(registry.get_or_register_counter("counter.25").unwrap()));
    });
}

criterion_group!(
    benches,
    benchmark_serialize,
    benchmark_histogram_update,
    benchmark_get_or_register
);
criterion_main!(benches);
