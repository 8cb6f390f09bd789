//! Criterion benchmarks for the forecast hot paths.
//!
//! 1. %K / %D over a year of bars
//! 2. Regressor fit on [%K, %D] → close
//! 3. Full forecast run (fit, predict, recompute, signals)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stochlab_core::config::StochConfig;
use stochlab_core::domain::Bar;
use stochlab_core::forecast::Forecaster;
use stochlab_core::indicators::Stochastic;
use stochlab_core::model::{HistGradientBoostingRegressor, Regressor};

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000 + (i as u64 % 500_000),
            }
        })
        .collect()
}

fn bench_oscillator(c: &mut Criterion) {
    let bars = make_bars(365);
    let stoch = Stochastic::default();
    c.bench_function("stochastic_365", |b| {
        b.iter(|| stoch.compute_both(black_box(&bars)))
    });
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("hgb_fit");
    for n in [250usize, 365, 1000] {
        let bars = make_bars(n);
        let (k, d) = Stochastic::default().compute_both(&bars);
        let x: Vec<Vec<f64>> = k.iter().zip(&d).map(|(&k, &d)| vec![k, d]).collect();
        let y: Vec<f64> = bars.iter().map(|b| b.close).collect();

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut model = HistGradientBoostingRegressor::default();
                model.fit(black_box(&x), black_box(&y)).unwrap();
                model
            })
        });
    }
    group.finish();
}

fn bench_forecast(c: &mut Criterion) {
    let bars = make_bars(365);
    let mut config = StochConfig::default();
    config.forecast.seed = Some(42);
    let forecaster = Forecaster::new(&config);

    c.bench_function("forecast_365_h30", |b| {
        b.iter(|| forecaster.run("BENCH", black_box(bars.clone())).unwrap())
    });
}

criterion_group!(benches, bench_oscillator, bench_fit, bench_forecast);
criterion_main!(benches);
