//! StochLab Core: market data, the stochastic oscillator and boosted-tree
//! price forecasting.
//!
//! Pipeline for one symbol:
//! - `data`: load a year of daily bars (Yahoo Finance, Parquet cache)
//! - `indicators`: %K / %D over the history
//! - `model`: fit a histogram gradient boosting regressor on [%K, %D] → close
//! - `forecast`: predict the horizon, add noise, append, recompute %K / %D
//! - `signals`: buy / sell crossovers over the extended frame
//! - `export`: optional CSV dump of the result

pub mod config;
pub mod data;
pub mod domain;
pub mod export;
pub mod forecast;
pub mod indicators;
pub mod model;
pub mod rng;
pub mod signals;

pub use config::StochConfig;
pub use domain::{Bar, StochasticFrame};
pub use forecast::{Forecast, ForecastError, Forecaster, Trend};
