//! Market data: provider trait, Yahoo Finance client, Parquet cache and the
//! history loader that ties them together.

pub mod cache;
pub mod circuit_breaker;
pub mod loader;
pub mod provider;
pub mod yahoo;

pub use cache::{CacheMeta, ParquetCache};
pub use circuit_breaker::CircuitBreaker;
pub use loader::{normalize_symbol, sanitize, HistoryLoader, LoadedHistory};
pub use provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
pub use yahoo::YahooProvider;
