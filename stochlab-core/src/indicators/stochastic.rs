//! Stochastic Oscillator: %K fast line and %D slow line.
//!
//! - %K[t] = 100 * (close[t] - min(low, k)) / (max(high, k) - min(low, k))
//! - %D[t] = mean(%K[t-d+1..=t])
//!
//! Lookback: k_period - 1 for %K, k_period + d_period - 2 for %D.
//! A zero high-low range over the window leaves %K undefined (NaN).

use super::rolling::{rolling_max, rolling_mean, rolling_min};
use super::Indicator;
use crate::domain::Bar;

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_D_PERIOD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Default for Stochastic {
    fn default() -> Self {
        Self::new(DEFAULT_K_PERIOD, DEFAULT_D_PERIOD)
    }
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize) -> Self {
        assert!(k_period >= 1, "Stochastic %K period must be >= 1");
        assert!(d_period >= 1, "Stochastic %D period must be >= 1");
        Self { k_period, d_period }
    }

    pub fn k_period(&self) -> usize {
        self.k_period
    }

    pub fn d_period(&self) -> usize {
        self.d_period
    }

    /// The %K fast line.
    pub fn percent_k(&self, bars: &[Bar]) -> Vec<f64> {
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lowest = rolling_min(&lows, self.k_period);
        let highest = rolling_max(&highs, self.k_period);

        bars.iter()
            .zip(lowest.iter().zip(highest.iter()))
            .map(|(bar, (&ll, &hh))| {
                let range = hh - ll;
                if range.is_nan() || range == 0.0 {
                    return f64::NAN;
                }
                100.0 * (bar.close - ll) / range
            })
            .collect()
    }

    /// The %D slow line: simple moving average of %K.
    pub fn percent_d(&self, percent_k: &[f64]) -> Vec<f64> {
        rolling_mean(percent_k, self.d_period)
    }

    /// Both lines in one pass over the bars.
    pub fn compute_both(&self, bars: &[Bar]) -> (Vec<f64>, Vec<f64>) {
        let k = self.percent_k(bars);
        let d = self.percent_d(&k);
        (k, d)
    }

    /// View of a single line as an `Indicator`.
    pub fn line(self, line: StochasticLine) -> StochasticSeries {
        let name = match line {
            StochasticLine::K => format!("stoch_k_{}", self.k_period),
            StochasticLine::D => format!("stoch_d_{}_{}", self.k_period, self.d_period),
        };
        StochasticSeries {
            stoch: self,
            line,
            name,
        }
    }
}

/// Which line of the oscillator a series exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StochasticLine {
    K,
    D,
}

#[derive(Debug, Clone)]
pub struct StochasticSeries {
    stoch: Stochastic,
    line: StochasticLine,
    name: String,
}

impl Indicator for StochasticSeries {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.line {
            StochasticLine::K => self.stoch.k_period - 1,
            StochasticLine::D => self.stoch.k_period + self.stoch.d_period - 2,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        match self.line {
            StochasticLine::K => self.stoch.percent_k(bars),
            StochasticLine::D => self.stoch.compute_both(bars).1,
        }
    }
}
