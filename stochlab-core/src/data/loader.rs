//! History loader: cache-then-fetch for the trailing lookback window.
//!
//! 1. Normalize the symbol; implausible symbols yield `NoData` without I/O.
//! 2. Fresh cache entry whose data matches its recorded hash → serve from
//!    cache (offline: any such entry).
//! 3. Otherwise fetch from the provider and write through to the cache.
//! 4. Sanitize, clip to the window, keep the last `max_history_bars` rows.

use super::cache::ParquetCache;
use super::provider::{DataError, DataProvider, DataSource, RawBar};
use crate::config::DataConfig;
use crate::domain::Bar;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

/// Sanitized history for one symbol.
#[derive(Debug, Clone)]
pub struct LoadedHistory {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub source: DataSource,
}

pub struct HistoryLoader<P: DataProvider> {
    provider: P,
    cache: Option<ParquetCache>,
    lookback_days: u32,
    max_history_bars: usize,
    offline: bool,
}

impl<P: DataProvider> HistoryLoader<P> {
    pub fn new(provider: P, config: &DataConfig) -> Self {
        Self {
            provider,
            cache: config
                .use_cache
                .then(|| ParquetCache::new(config.cache_dir.clone())),
            lookback_days: config.lookback_days,
            max_history_bars: config.max_history_bars,
            offline: config.offline,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// First and last calendar day of the lookback window ending at `today`.
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = today - chrono::Duration::days(i64::from(self.lookback_days));
        (start, today)
    }

    /// Load the history for `symbol` as of `today`.
    pub fn load(&self, symbol: &str, today: NaiveDate) -> Result<LoadedHistory, DataError> {
        let Some(symbol) = normalize_symbol(symbol) else {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        };
        let (start, end) = self.window(today);

        let (bars, source) = match self.from_cache(&symbol, start, end) {
            Some(bars) => (bars, DataSource::Cache),
            None if self.offline => {
                return Err(DataError::NoData { symbol });
            }
            None => {
                let fetched = self.provider.fetch(&symbol, start, end)?;
                let bars = sanitize(fetched.bars);
                if let (Some(cache), false) = (&self.cache, bars.is_empty()) {
                    if let Err(e) = cache.write(&symbol, &bars, start, end) {
                        warn!(symbol = %symbol, error = %e, "cache write failed");
                    }
                }
                (bars, fetched.source)
            }
        };

        let bars = clip(bars, start, end, self.max_history_bars);
        if bars.is_empty() {
            return Err(DataError::NoData { symbol });
        }

        info!(
            symbol = %symbol,
            bars = bars.len(),
            ?source,
            first = %bars[0].date,
            last = %bars[bars.len() - 1].date,
            "history loaded"
        );
        Ok(LoadedHistory {
            symbol,
            bars,
            source,
        })
    }

    fn from_cache(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Option<Vec<Bar>> {
        let cache = self.cache.as_ref()?;
        if !self.offline && !cache.is_fresh(symbol, start, end) {
            debug!(symbol, "cache stale or missing");
            return None;
        }
        // A hash mismatch (edited or partly quarantined partitions) counts as a miss.
        match cache.load_verified(symbol) {
            Ok(bars) => Some(bars),
            Err(DataError::NoCachedData { .. }) => None,
            Err(e) => {
                warn!(symbol, error = %e, "cache entry rejected, refetching");
                None
            }
        }
    }
}

/// Upper-case a ticker and reject anything that cannot be a market symbol.
///
/// Allowed characters: ASCII letters, digits and `.-^=_`.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim();
    let valid = !symbol.is_empty()
        && symbol.len() <= 32
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || ".-^=_".contains(c));
    valid.then(|| symbol.to_ascii_uppercase())
}

/// Drop bars without a finite close, sort by date, collapse duplicate dates
/// to their last occurrence.
pub fn sanitize(raw: Vec<RawBar>) -> Vec<Bar> {
    let mut bars: Vec<Bar> = raw
        .into_iter()
        .filter(|b| b.close.is_finite())
        .map(|b| Bar {
            date: b.date,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        })
        .collect();

    // Stable sort keeps provider order within a date, so the last wins below.
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(prev) if prev.date == bar.date => *prev = bar,
            _ => out.push(bar),
        }
    }

    // Only the close feeds the model; inconsistent ranges are kept.
    let inconsistent = out.iter().filter(|b| !b.is_sane()).count();
    if inconsistent > 0 {
        debug!(inconsistent, "bars with inconsistent OHLC");
    }
    out
}

fn clip(bars: Vec<Bar>, start: NaiveDate, end: NaiveDate, max_bars: usize) -> Vec<Bar> {
    let mut bars: Vec<Bar> = bars
        .into_iter()
        .filter(|b| b.date >= start && b.date <= end)
        .collect();
    if bars.len() > max_bars {
        bars.drain(..bars.len() - max_bars);
    }
    bars
}
