//! End-to-end: provider → loader (with Parquet cache) → forecaster → export.

use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use stochlab_core::config::{DataConfig, StochConfig};
use stochlab_core::data::{
    DataError, DataProvider, DataSource, FetchResult, HistoryLoader, RawBar,
};
use stochlab_core::export::export_forecast;
use stochlab_core::forecast::{Forecaster, Trend};

/// Deterministic random-walk-ish daily series, weekdays only.
struct SyntheticProvider {
    calls: AtomicUsize,
}

impl SyntheticProvider {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        use chrono::Datelike;

        self.calls.fetch_add(1, Ordering::SeqCst);
        if symbol == "BOGUS" {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let bars = start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| d.weekday().number_from_monday() <= 5)
            .enumerate()
            .map(|(i, date)| {
                let t = i as f64;
                let close = 150.0 + (t * 0.11).sin() * 12.0 + (t * 0.031).cos() * 6.0;
                RawBar {
                    date,
                    open: close - 0.4,
                    high: close + 1.2 + (t * 0.7).sin().abs(),
                    low: close - 1.1 - (t * 0.5).cos().abs(),
                    close,
                    volume: 1_000_000 + i as u64,
                }
            })
            .collect();

        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::Fixture,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

fn config(cache_dir: &std::path::Path) -> StochConfig {
    let mut config = StochConfig::default();
    config.data = DataConfig {
        cache_dir: cache_dir.to_path_buf(),
        ..DataConfig::default()
    };
    config.forecast.seed = Some(2024);
    config
}

#[test]
fn full_pipeline_produces_a_consistent_forecast() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let loader = HistoryLoader::new(SyntheticProvider::new(), &config.data);
    let forecaster = Forecaster::new(&config);

    let history = loader.load("synth", today()).unwrap();
    assert_eq!(history.symbol, "SYNTH");
    assert!(history.bars.len() > 250 && history.bars.len() <= 262);

    let forecast = forecaster.run(&history.symbol, history.bars.clone()).unwrap();
    let frame = &forecast.frame;

    assert_eq!(frame.history_len(), history.bars.len());
    assert_eq!(frame.forecast_len(), 30);
    assert_eq!(frame.history(), history.bars.as_slice());
    assert!(frame.dates().windows(2).all(|w| w[0] < w[1]));

    // Historical oscillator values are unchanged by the recompute.
    let (k, _) = forecaster.stochastic().compute_both(&history.bars);
    for (a, b) in k.iter().zip(&frame.percent_k) {
        assert!(a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()));
    }
    // Close-only forecast rows leave the oscillator undefined there.
    assert!(frame.percent_k[frame.history_len()..]
        .iter()
        .all(|v| v.is_nan()));

    let last = frame.last_actual_close().unwrap();
    let fin = forecast.final_close().unwrap();
    assert_eq!(forecast.trend == Trend::Up, fin >= last);

    let csv = export_forecast(&dir.path().join("out"), &forecast).unwrap();
    assert!(csv.ends_with("SYNTH_forecast.csv"));
}

#[test]
fn cached_history_reproduces_the_seeded_forecast() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let loader = HistoryLoader::new(SyntheticProvider::new(), &config.data);
    let forecaster = Forecaster::new(&config);

    let fetched = loader.load("SYNTH", today()).unwrap();
    let cached = loader.load("SYNTH", today()).unwrap();
    assert_eq!(fetched.source, DataSource::Fixture);
    assert_eq!(cached.source, DataSource::Cache);
    assert_eq!(loader.provider().calls.load(Ordering::SeqCst), 1);

    let a = forecaster.run("SYNTH", fetched.bars).unwrap();
    let b = forecaster.run("SYNTH", cached.bars).unwrap();
    assert_eq!(a.predicted_closes, b.predicted_closes);
    assert_eq!(a.signals, b.signals);
}

#[test]
fn bogus_symbol_is_reported_as_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let loader = HistoryLoader::new(SyntheticProvider::new(), &config.data);

    let err = loader.load("bogus", today()).unwrap_err();
    assert!(err.is_no_data());
    assert!(!dir.path().join("symbol=BOGUS").exists());
}

#[test]
fn custom_horizon_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StochConfig::from_toml("[forecast]\nhorizon = 7\nseed = 1\n").unwrap();
    config.data.cache_dir = dir.path().to_path_buf();

    let loader = HistoryLoader::new(SyntheticProvider::new(), &config.data);
    let history = loader.load("SYNTH", today()).unwrap();
    let forecast = Forecaster::new(&config).run("SYNTH", history.bars).unwrap();

    assert_eq!(forecast.frame.forecast_len(), 7);
    assert_eq!(
        forecast.frame.last_date().unwrap(),
        today() + chrono::Duration::days(7)
    );
}
