//! Criterion benchmarks for PivotLab hot paths.
//!
//! Benchmarks:
//! 1. Level computation from a reference bar
//! 2. Classification of a price sweep across all zones
//! 3. Trend estimation over growing windows

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use pivotlab_core::classifier::{classify, ClassifierPolicy};
use pivotlab_core::domain::Bar;
use pivotlab_core::indicators::estimate_trend;
use pivotlab_core::levels::{compute_levels, Buffer, LevelRounding};

// ── Helpers ──────────────────────────────────────────────────────────

fn reference_bar() -> Bar {
    Bar::from_f64(
        Utc.with_ymd_and_hms(2025, 3, 13, 10, 0, 0).unwrap(),
        21_000.0,
        21_801.45,
        16_828.35,
        21_731.4,
    )
    .unwrap()
}

fn make_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2025, 3, 14, 3, 45, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 20_000.0 + (i as f64 * 0.1).sin() * 150.0;
            Bar::from_f64(
                base + Duration::minutes(3 * i as i64),
                close - 5.0,
                close + 20.0,
                close - 20.0,
                close,
            )
            .unwrap()
        })
        .collect()
}

// ── 1. Levels ────────────────────────────────────────────────────────

fn bench_levels(c: &mut Criterion) {
    let bar = reference_bar();
    let mut group = c.benchmark_group("levels");
    for rounding in [LevelRounding::Independent, LevelRounding::Chained] {
        group.bench_function(format!("{rounding:?}"), |b| {
            b.iter(|| compute_levels(black_box(&bar), rounding))
        });
    }
    group.finish();
}

// ── 2. Classifier ────────────────────────────────────────────────────

fn bench_classify(c: &mut Criterion) {
    let levels = compute_levels(&reference_bar(), LevelRounding::Independent).unwrap();
    let buffer = Buffer::new(Decimal::from(12)).unwrap();
    let policy = ClassifierPolicy::default();
    let prices: Vec<Decimal> = (0..1_000)
        .map(|i| Decimal::from(15_000) + Decimal::from(i * 13))
        .collect();

    c.bench_function("classify_sweep_1000", |b| {
        b.iter(|| {
            for &price in &prices {
                black_box(classify(price, &levels, buffer, policy));
            }
        })
    });
}

// ── 3. Trend ─────────────────────────────────────────────────────────

fn bench_trend(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_trend");
    let multiplier = Decimal::from(3);
    for n in [15usize, 125, 500] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| estimate_trend("BENCH", black_box(bars), 14, multiplier))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_levels, bench_classify, bench_trend);
criterion_main!(benches);
