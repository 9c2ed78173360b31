//! Criterion benchmarks for PairLab hot paths.
//!
//! Benchmarks:
//! 1. Unit-root test over typical window lengths
//! 2. Full relationship test (hedge fit + spread + unit-root test)
//! 3. Simulation loop over several assets

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use pairlab_core::data::{align_common_dates, cointegrated_pair, SyntheticProvider};
use pairlab_core::engine::{run_simulation, EngineConfig, NullObserver};
use pairlab_core::relationship::RelationshipTester;
use pairlab_core::stats::adf_test;

// ── Helpers ──────────────────────────────────────────────────────────

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
}

fn spread(n: usize) -> Vec<f64> {
    let mut x = 0.0;
    (0..n)
        .map(|i| {
            x = 0.6 * x + ((i as f64) * 1.7).sin();
            x
        })
        .collect()
}

// ── 1. Unit-root test ────────────────────────────────────────────────

fn bench_adf(c: &mut Criterion) {
    let mut group = c.benchmark_group("adf_test");
    for &n in &[60, 252, 1000] {
        let s = spread(n);
        group.bench_with_input(BenchmarkId::new("autolag", n), &n, |b, _| {
            b.iter(|| adf_test(black_box(&s), None))
        });
    }
    group.finish();
}

// ── 2. Relationship test ─────────────────────────────────────────────

fn bench_relationship(c: &mut Criterion) {
    let (a, b) = cointegrated_pair("A", "B", start(), 400, 1.7, 1.0).unwrap();
    let (ca, cb) = (a.closes(), b.closes());
    let tester = RelationshipTester::default();
    c.bench_function("test_relationship_252", |bch| {
        bch.iter(|| tester.test_relationship(black_box(&ca), black_box(&cb), 252))
    });
}

// ── 3. Simulation loop ───────────────────────────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    group.sample_size(10);

    let provider = SyntheticProvider::default();
    for &assets in &[2usize, 4] {
        let series: Vec<_> = (0..assets)
            .map(|i| provider.generate(&format!("S{i}/USDT"), start(), 400).unwrap())
            .collect();
        let data = align_common_dates(&series);
        let mut config = EngineConfig::new(100_000.0);
        config.lookback = 120;

        group.bench_with_input(BenchmarkId::new("assets", assets), &assets, |b, _| {
            b.iter(|| run_simulation(black_box(&data), black_box(&config), &mut NullObserver))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_adf, bench_relationship, bench_simulation);
criterion_main!(benches);
