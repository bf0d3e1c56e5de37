//! Criterion benchmarks for integration throughput per scheme.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strider_bench::{advance, oscillator_profile, Oscillators};
use strider_integrators::SCHEMES;

/// Benchmark: 100 steps of 1000 oscillators (2000 states) per scheme.
fn bench_oscillators_1k(c: &mut Criterion) {
    let mut group = c.benchmark_group("oscillators_1k_100_steps");
    for scheme in SCHEMES {
        group.bench_with_input(BenchmarkId::from_parameter(scheme), scheme, |b, scheme| {
            let (sim, bank) = oscillator_profile(scheme, 1000).unwrap();
            b.iter(|| {
                advance(&sim, 0.01, 100).unwrap();
                black_box(Oscillators::energy(&bank));
            });
        });
    }
    group.finish();
}

/// Benchmark: one adaptive Dopri45 run over a full period, tolerance 1e-8.
fn bench_dopri45_adaptive(c: &mut Criterion) {
    c.bench_function("dopri45_adaptive_period", |b| {
        b.iter(|| {
            let (sim, bank) = oscillator_profile("dopri45", 100).unwrap();
            sim.integration_tolerance(1e-8);
            sim.run(0.01, std::f64::consts::TAU).unwrap();
            black_box(Oscillators::energy(&bank));
        });
    });
}

criterion_group!(benches, bench_oscillators_1k, bench_dopri45_adaptive);
criterion_main!(benches);
