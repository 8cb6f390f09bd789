//! Forecast pipeline: fit the regressor on the oscillator, predict future
//! closes, append them to the frame and recompute %K / %D.
//!
//! Every future feature row is the last actual (%K, %D) pair, so the model
//! output is one constant; the per-day variation comes entirely from the
//! Gaussian noise term `N(0, noise_fraction * std(close))`.

use crate::config::StochConfig;
use crate::domain::{Bar, StochasticFrame};
use crate::indicators::Stochastic;
use crate::model::{BoostingParams, HistGradientBoostingRegressor, ModelError, Regressor};
use crate::rng::NoiseSeeder;
use crate::signals::{frame_signals, CrossSignal, SignalThresholds};
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("no history for {symbol}")]
    EmptyHistory { symbol: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("invalid noise distribution: {0}")]
    Noise(String),
}

/// Direction of the forecast relative to the last actual close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    pub fn from_closes(last_actual: f64, final_predicted: f64) -> Self {
        if final_predicted >= last_actual {
            Trend::Up
        } else {
            Trend::Down
        }
    }
}

/// Output of one forecast run.
#[derive(Debug, Clone)]
pub struct Forecast {
    /// History plus predicted rows, oscillator recomputed over both.
    pub frame: StochasticFrame,
    /// Predicted closes, noise included.
    pub predicted_closes: Vec<f64>,
    /// Raw model output for the future feature row, before noise.
    pub model_prediction: f64,
    pub noise_sigma: f64,
    pub trend: Trend,
    pub signals: Vec<CrossSignal>,
}

impl Forecast {
    pub fn symbol(&self) -> &str {
        &self.frame.symbol
    }

    pub fn final_close(&self) -> Option<f64> {
        self.predicted_closes.last().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Forecaster {
    stochastic: Stochastic,
    params: BoostingParams,
    thresholds: SignalThresholds,
    horizon: usize,
    noise_fraction: f64,
    seeder: NoiseSeeder,
}

impl Forecaster {
    pub fn new(config: &StochConfig) -> Self {
        Self {
            stochastic: config.indicator.stochastic(),
            params: config.model,
            thresholds: config.signals,
            horizon: config.forecast.horizon,
            noise_fraction: config.forecast.noise_fraction,
            seeder: NoiseSeeder::new(config.forecast.seed),
        }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn stochastic(&self) -> &Stochastic {
        &self.stochastic
    }

    /// Run the full pipeline over sanitized, date-ascending bars.
    pub fn run(&self, symbol: &str, history: Vec<Bar>) -> Result<Forecast, ForecastError> {
        if history.is_empty() {
            return Err(ForecastError::EmptyHistory {
                symbol: symbol.to_string(),
            });
        }

        let mut frame = StochasticFrame::from_history(symbol, history, &self.stochastic);

        let features: Vec<Vec<f64>> = frame
            .percent_k
            .iter()
            .zip(&frame.percent_d)
            .map(|(&k, &d)| vec![k, d])
            .collect();
        let targets = frame.closes();

        let mut model = HistGradientBoostingRegressor::new(self.params)?;
        model.fit(&features, &targets)?;

        let (last_k, last_d) = frame
            .last_actual_oscillator()
            .ok_or_else(|| ForecastError::EmptyHistory {
                symbol: symbol.to_string(),
            })?;
        let future_rows = vec![vec![last_k, last_d]; self.horizon];
        let raw = model.predict(&future_rows)?;
        let model_prediction = raw.first().copied().unwrap_or(f64::NAN);

        let noise_sigma = self.noise_fraction * sample_std(&targets);
        let normal =
            Normal::new(0.0, noise_sigma).map_err(|e| ForecastError::Noise(e.to_string()))?;

        let (last_date, last_close) = match (frame.last_actual_date(), frame.last_actual_close()) {
            (Some(date), Some(close)) => (date, close),
            _ => {
                return Err(ForecastError::EmptyHistory {
                    symbol: symbol.to_string(),
                })
            }
        };

        let mut rng = self.seeder.rng_for(symbol, last_date);
        let predicted_closes: Vec<f64> = raw.iter().map(|p| p + rng.sample(normal)).collect();

        let predicted_bars: Vec<Bar> = last_date
            .iter_days()
            .skip(1)
            .zip(&predicted_closes)
            .map(|(date, &close)| Bar::predicted(date, close))
            .collect();

        debug!(
            symbol,
            last_k,
            last_d,
            model_prediction,
            noise_sigma,
            iterations = model.n_iter(),
            "model fitted"
        );

        frame.extend_with_forecast(predicted_bars);
        frame.recompute(&self.stochastic);

        let final_close = predicted_closes.last().copied().unwrap_or(last_close);
        let trend = Trend::from_closes(last_close, final_close);
        let signals = frame_signals(&frame, &self.thresholds);

        info!(
            symbol,
            history = frame.history_len(),
            horizon = frame.forecast_len(),
            last_close,
            final_close,
            ?trend,
            signals = signals.len(),
            "forecast complete"
        );

        Ok(Forecast {
            frame,
            predicted_closes,
            model_prediction,
            noise_sigma,
            trend,
            signals,
        })
    }
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn wave(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 8.0 + i as f64 * 0.05)
            .collect();
        make_bars(&closes)
    }

    fn seeded(seed: u64) -> StochConfig {
        let mut config = StochConfig::default();
        config.forecast.seed = Some(seed);
        config
    }

    #[test]
    fn sample_std_matches_hand_computation() {
        assert_eq!(sample_std(&[]), 0.0);
        assert_eq!(sample_std(&[5.0]), 0.0);
        // mean 5, squared deviations 9 + 1 + 1 + 9 = 20, / 3
        let s = sample_std(&[2.0, 4.0, 6.0, 8.0]);
        assert!((s - (20.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn appends_horizon_rows_with_consecutive_dates() {
        let forecaster = Forecaster::new(&seeded(1));
        let forecast = forecaster.run("WAVE", wave(200)).unwrap();

        assert_eq!(forecast.frame.history_len(), 200);
        assert_eq!(forecast.frame.forecast_len(), 30);
        assert_eq!(forecast.predicted_closes.len(), 30);

        let dates = forecast.frame.dates();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        let last_actual = forecast.frame.last_actual_date().unwrap();
        assert_eq!(forecast.frame.forecast()[0].date, last_actual.succ_opt().unwrap());
        assert_eq!(
            forecast.frame.last_date().unwrap(),
            last_actual + chrono::Duration::days(30)
        );
    }

    #[test]
    fn same_seed_same_forecast() {
        let a = Forecaster::new(&seeded(42)).run("WAVE", wave(120)).unwrap();
        let b = Forecaster::new(&seeded(42)).run("WAVE", wave(120)).unwrap();
        assert_eq!(a.predicted_closes, b.predicted_closes);

        let c = Forecaster::new(&seeded(43)).run("WAVE", wave(120)).unwrap();
        assert_ne!(a.predicted_closes, c.predicted_closes);
    }

    #[test]
    fn zero_noise_predicts_one_constant() {
        let mut config = seeded(0);
        config.forecast.noise_fraction = 0.0;
        let forecast = Forecaster::new(&config).run("WAVE", wave(150)).unwrap();

        assert_eq!(forecast.noise_sigma, 0.0);
        assert!(forecast
            .predicted_closes
            .iter()
            .all(|&p| p == forecast.model_prediction));
        assert!(forecast.model_prediction.is_finite());
    }

    #[test]
    fn oscillator_is_undefined_over_the_forecast() {
        let forecast = Forecaster::new(&seeded(9)).run("WAVE", wave(100)).unwrap();
        let frame = &forecast.frame;
        let h = frame.history_len();
        assert_eq!(frame.percent_k.len(), frame.len());
        assert!(frame.percent_k[h..].iter().all(|v| v.is_nan()));
        assert!(frame.percent_d[h..].iter().all(|v| v.is_nan()));
        // History keeps its values after the recompute.
        assert!(!frame.percent_k[h - 1].is_nan());
        assert!(!frame.percent_d[h - 1].is_nan());
        assert!(forecast.signals.iter().all(|s| !s.predicted));
    }

    #[test]
    fn trend_follows_final_close() {
        let forecast = Forecaster::new(&seeded(5)).run("WAVE", wave(80)).unwrap();
        let last = forecast.frame.last_actual_close().unwrap();
        let fin = forecast.final_close().unwrap();
        let expected = if fin >= last { Trend::Up } else { Trend::Down };
        assert_eq!(forecast.trend, expected);

        assert_eq!(Trend::from_closes(10.0, 10.0), Trend::Up);
        assert_eq!(Trend::from_closes(10.0, 9.99), Trend::Down);
    }

    #[test]
    fn short_history_still_forecasts() {
        // Fewer rows than the %K window: every feature is NaN.
        let forecast = Forecaster::new(&seeded(3)).run("TINY", wave(5)).unwrap();
        assert_eq!(forecast.frame.forecast_len(), 30);
        assert!(forecast.predicted_closes.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn empty_history_is_an_error() {
        let err = Forecaster::new(&StochConfig::default())
            .run("NONE", Vec::new())
            .unwrap_err();
        assert!(matches!(err, ForecastError::EmptyHistory { .. }));
    }

    #[test]
    fn signals_only_reference_frame_rows() {
        let forecast = Forecaster::new(&seeded(11)).run("WAVE", wave(250)).unwrap();
        for s in &forecast.signals {
            assert!(s.index < forecast.frame.len());
            assert_eq!(s.date, forecast.frame.bars[s.index].date);
            assert_eq!(s.predicted, s.index >= forecast.frame.history_len());
        }
    }
}
