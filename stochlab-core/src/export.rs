//! CSV export of a forecast frame.
//!
//! One row per frame row: `date,open,high,low,close,volume,percent_k,percent_d,predicted`.
//! Undefined prices and oscillator values are written as empty fields.

use crate::forecast::Forecast;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("csv write error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct ForecastRow {
    date: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: f64,
    volume: u64,
    percent_k: Option<f64>,
    percent_d: Option<f64>,
    predicted: bool,
}

fn defined(v: f64) -> Option<f64> {
    (!v.is_nan()).then_some(v)
}

/// Write the forecast frame as CSV to any writer.
pub fn write_forecast_csv<W: Write>(writer: W, forecast: &Forecast) -> Result<(), ExportError> {
    let frame = &forecast.frame;
    let mut wtr = csv::Writer::from_writer(writer);
    for (i, bar) in frame.bars.iter().enumerate() {
        wtr.serialize(ForecastRow {
            date: bar.date.format("%Y-%m-%d").to_string(),
            open: defined(bar.open),
            high: defined(bar.high),
            low: defined(bar.low),
            close: bar.close,
            volume: bar.volume,
            percent_k: defined(frame.percent_k[i]),
            percent_d: defined(frame.percent_d[i]),
            predicted: frame.is_predicted(i),
        })?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Path of the export file for `symbol` inside `dir`.
pub fn forecast_csv_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{symbol}_forecast.csv"))
}

/// Write `<dir>/<SYMBOL>_forecast.csv`, creating `dir` if needed.
pub fn export_forecast(dir: &Path, forecast: &Forecast) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = forecast_csv_path(dir, forecast.symbol());
    let file = fs::File::create(&path).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    write_forecast_csv(std::io::BufWriter::new(file), forecast)?;
    tracing::info!(path = %path.display(), rows = forecast.frame.len(), "forecast exported");
    Ok(path)
}
