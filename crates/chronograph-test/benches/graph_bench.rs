//! Benchmarks for sync graph construction and time conversion

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chronograph_core::TimeMapping;
use chronograph_sync::GraphConfig;
use chronograph_test::{mapping_chain, scenarios};

fn bench_build_linked_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_linked_chain");
    for devices in [8usize, 32, 128] {
        let sim = scenarios::linked_chain(devices, 42);
        group.bench_with_input(BenchmarkId::from_parameter(devices), &sim, |b, sim| {
            b.iter(|| black_box(sim.build(GraphConfig::default()).unwrap()))
        });
    }
    group.finish();
}

fn bench_build_utc_swarm(c: &mut Criterion) {
    let sim = scenarios::utc_swarm(32, 7);

    c.bench_function("build_utc_swarm_32", |b| {
        b.iter(|| black_box(sim.build(GraphConfig::default()).unwrap()))
    });
}

fn bench_time_convert_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("time_convert_chain");
    for hops in [1usize, 16, 128] {
        let mappings = vec![TimeMapping::new(1.0001, 0.5).unwrap(); hops];
        let (graph, nodes) = mapping_chain(&mappings).unwrap();
        let (from, to) = (nodes[0], nodes[hops]);
        group.bench_with_input(BenchmarkId::from_parameter(hops), &hops, |b, _| {
            b.iter(|| graph.time_convert(black_box(from), black_box(to), black_box(12.5)))
        });
    }
    group.finish();
}

fn bench_time_convert_many(c: &mut Criterion) {
    let sim = scenarios::linked_chain(16, 3);
    let session = sim.build(GraphConfig::default()).unwrap();
    let from = sim.local_node(&session, 0, 0).unwrap();
    let to = sim.local_node(&session, 15, 0).unwrap();
    let samples: Vec<f64> = (0..10_000).map(|i| i as f64 * 0.001).collect();
    let graph = session.read();

    c.bench_function("time_convert_many_10k", |b| {
        b.iter(|| graph.time_convert_many(black_box(from), black_box(to), black_box(&samples)))
    });
}

criterion_group!(
    benches,
    bench_build_linked_chain,
    bench_build_utc_swarm,
    bench_time_convert_chain,
    bench_time_convert_many,
);
criterion_main!(benches);
