//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Example:
//!
//! ```toml
//! [data]
//! lookback_days = 365
//! cache_dir = "data"
//!
//! [indicator]
//! k_period = 14
//! d_period = 3
//!
//! [forecast]
//! horizon = 30
//! noise_fraction = 0.2
//! seed = 42
//!
//! [model]
//! max_iter = 100
//! learning_rate = 0.1
//!
//! [signals]
//! overbought = 80.0
//! oversold = 20.0
//! ```

use crate::indicators::stochastic::{DEFAULT_D_PERIOD, DEFAULT_K_PERIOD};
use crate::indicators::Stochastic;
use crate::model::BoostingParams;
use crate::signals::SignalThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochConfig {
    pub data: DataConfig,
    pub indicator: IndicatorConfig,
    pub forecast: ForecastConfig,
    pub model: BoostingParams,
    pub signals: SignalThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Calendar days of history requested from the provider.
    pub lookback_days: u32,
    /// Maximum number of most recent bars kept for fitting.
    pub max_history_bars: usize,
    pub cache_dir: PathBuf,
    pub use_cache: bool,
    /// Never touch the network; serve from the cache only.
    pub offline: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            lookback_days: 365,
            max_history_bars: 365,
            cache_dir: PathBuf::from("data"),
            use_cache: true,
            offline: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub k_period: usize,
    pub d_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            k_period: DEFAULT_K_PERIOD,
            d_period: DEFAULT_D_PERIOD,
        }
    }
}

impl IndicatorConfig {
    pub fn stochastic(&self) -> Stochastic {
        Stochastic::new(self.k_period, self.d_period)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of future calendar days to predict.
    pub horizon: usize,
    /// Noise standard deviation as a fraction of the closing-price std.
    pub noise_fraction: f64,
    pub seed: Option<u64>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 30,
            noise_fraction: 0.2,
            seed: None,
        }
    }
}

impl StochConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: StochConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indicator.k_period == 0 || self.indicator.d_period == 0 {
            return Err(ConfigError::Invalid(
                "indicator periods must be at least 1".into(),
            ));
        }
        if self.forecast.horizon == 0 {
            return Err(ConfigError::Invalid("forecast horizon must be at least 1".into()));
        }
        if !self.forecast.noise_fraction.is_finite() || self.forecast.noise_fraction < 0.0 {
            return Err(ConfigError::Invalid(
                "forecast noise_fraction must be a non-negative number".into(),
            ));
        }
        if self.data.lookback_days == 0 || self.data.max_history_bars == 0 {
            return Err(ConfigError::Invalid(
                "data lookback_days and max_history_bars must be at least 1".into(),
            ));
        }
        if self.signals.oversold > self.signals.overbought {
            return Err(ConfigError::Invalid(
                "signals oversold threshold must not exceed overbought".into(),
            ));
        }
        self.model
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
