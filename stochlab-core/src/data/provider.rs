//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over price sources so the history loader
//! can be driven by Yahoo Finance in production and by fixtures in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw daily OHLCV bar from a provider, before sanitation.
///
/// Missing price fields are carried as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Debug, Error)]
pub enum DataError {
    /// The provider answered but has no bars for this symbol and window.
    #[error("no data available for symbol '{symbol}'")]
    NoData { symbol: String },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("provider blocked: circuit breaker tripped, retry in {remaining_secs}s")]
    CircuitBreakerTripped { remaining_secs: u64 },

    #[error("no cached data for symbol '{symbol}'")]
    NoCachedData { symbol: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// True for the "nothing to show" outcome the interactive loop recovers from.
    pub fn is_no_data(&self) -> bool {
        matches!(self, DataError::NoData { .. })
    }
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
}

/// Where a set of bars came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Cache,
    Fixture,
}

pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for `symbol` with dates in `[start, end]`.
    ///
    /// A symbol the provider does not know, or a window with no trading
    /// days, is reported as `DataError::NoData`.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// False while the provider refuses requests (e.g. circuit breaker open).
    fn is_available(&self) -> bool;
}

impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        (**self).fetch(symbol, start, end)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_no_data_is_recoverable() {
        assert!(DataError::NoData {
            symbol: "ZZZZ".into()
        }
        .is_no_data());
        assert!(!DataError::NetworkUnreachable("dns".into()).is_no_data());
        assert!(!DataError::CircuitBreakerTripped { remaining_secs: 5 }.is_no_data());
    }

    #[test]
    fn error_messages_name_the_symbol() {
        let err = DataError::NoData {
            symbol: "ZZZZ".into(),
        };
        assert_eq!(err.to_string(), "no data available for symbol 'ZZZZ'");
    }
}
