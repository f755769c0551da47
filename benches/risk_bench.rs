//! Performance benchmarks for estimation, backtesting and simulation.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tailrisk::backtest::run_backtests;
use tailrisk::config::{Confidence, RiskSettings};
use tailrisk::historical::estimate_var_es;
use tailrisk::monte_carlo::StudentTSimulator;
use tailrisk::optimizer::{efficient_frontier, OptimizerSettings};
use tailrisk::rolling::rolling_forecast;
use tailrisk::types::{ReturnMatrix, ReturnSeries};

/// Generate synthetic daily returns for benchmarking.
fn generate_returns(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            (x * 0.7).sin() * 0.012 + (x * 1.3).cos() * 0.006 + (x * 0.031).sin() * 0.003
        })
        .collect()
}

fn generate_matrix(count: usize) -> ReturnMatrix {
    let rows = (0..count)
        .map(|i| {
            let x = i as f64;
            vec![
                (x * 0.7).sin() * 0.03,
                (x * 1.3).cos() * 0.008,
                (x * 0.37).sin() * 0.01 + (x * 2.1).cos() * 0.004,
            ]
        })
        .collect();
    ReturnMatrix::from_rows(rows).expect("valid matrix")
}

/// Benchmark point estimates.
fn bench_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_var_es");
    for size in [250, 1000, 5000] {
        let returns = generate_returns(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &returns, |b, r| {
            b.iter(|| estimate_var_es(black_box(r), Confidence::P99, 1.0))
        });
    }
    group.finish();
}

/// Benchmark rolling forecasts and the full backtest suite.
fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest");
    for size in [500, 2000] {
        let series = ReturnSeries::from_values(generate_returns(size));
        group.bench_with_input(BenchmarkId::new("rolling_forecast", size), &series, |b, s| {
            b.iter(|| rolling_forecast(black_box(s), Confidence::P99, 250))
        });
        group.bench_with_input(BenchmarkId::new("run_backtests", size), &series, |b, s| {
            b.iter(|| run_backtests(black_box(s), &RiskSettings::default()))
        });
    }
    group.finish();
}

/// Benchmark scenario generation and the weight search.
fn bench_simulation(c: &mut Criterion) {
    let history = generate_matrix(1000);
    let simulator = StudentTSimulator::calibrate(&history, 5.0).expect("calibration");

    c.bench_function("simulate_5000_days", |b| {
        let mut rng = StdRng::seed_from_u64(42);
        b.iter(|| simulator.simulate(black_box(5000), &mut rng))
    });

    let settings = OptimizerSettings {
        n_portfolios: 500,
        ..Default::default()
    };
    c.bench_function("efficient_frontier_500", |b| {
        let mut rng = StdRng::seed_from_u64(42);
        b.iter(|| efficient_frontier(black_box(&history), &settings, &mut rng))
    });
}

criterion_group!(benches, bench_estimate, bench_backtest, bench_simulation);
criterion_main!(benches);
