//! Interactive prompt loop.
//!
//! One ticker per line. `exit` in any letter case (or end of input) ends the
//! session. A ticker with no data prints a notice and the loop continues;
//! every other failure ends the session with an error.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use stochlab_core::data::{DataError, DataProvider, HistoryLoader};
use stochlab_core::export::export_forecast;
use stochlab_core::forecast::{Forecast, ForecastError, Forecaster};
use tracing::{info, warn};

pub const PROMPT: &str = "Enter the stock ticker symbol or 'exit' to finish: ";

/// Displays a finished forecast; blocks until the user is done with it.
pub trait ChartPresenter {
    fn present(&mut self, forecast: &Forecast) -> Result<()>;
}

pub fn no_data_message(ticker: &str) -> String {
    format!("No data available for the stock ticker symbol: {ticker}. Please try another symbol.")
}

/// Strip one trailing `\n` or `\r\n`.
fn strip_line_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

pub fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit")
}

/// What happened to one ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Presented { symbol: String },
    NoData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub presented: usize,
    pub no_data: usize,
}

pub struct Session<P: DataProvider, C: ChartPresenter> {
    loader: HistoryLoader<P>,
    forecaster: Forecaster,
    presenter: C,
    export_dir: Option<PathBuf>,
    today: Option<NaiveDate>,
}

impl<P: DataProvider, C: ChartPresenter> Session<P, C> {
    pub fn new(loader: HistoryLoader<P>, forecaster: Forecaster, presenter: C) -> Self {
        Self {
            loader,
            forecaster,
            presenter,
            export_dir: None,
            today: None,
        }
    }

    /// Also write `<dir>/<SYMBOL>_forecast.csv` for every presented forecast.
    pub fn with_export_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.export_dir = dir;
        self
    }

    /// Pin the end of the lookback window instead of using the local date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn presenter(&self) -> &C {
        &self.presenter
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Prompt, read, process until `exit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut out: W) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();
        let mut line = String::new();

        loop {
            write!(out, "{PROMPT}")?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line).context("failed to read input")? == 0 {
                writeln!(out)?;
                break;
            }

            let ticker = strip_line_terminator(&line);
            if is_exit(ticker) {
                break;
            }

            match self.process(ticker)? {
                Step::Presented { .. } => summary.presented += 1,
                Step::NoData => {
                    summary.no_data += 1;
                    writeln!(out, "{}", no_data_message(ticker))?;
                }
            }
        }

        info!(
            presented = summary.presented,
            no_data = summary.no_data,
            "session finished"
        );
        Ok(summary)
    }

    /// Load, forecast, present and optionally export one ticker.
    pub fn process(&mut self, ticker: &str) -> Result<Step> {
        let history = match self.loader.load(ticker, self.today()) {
            Ok(history) => history,
            Err(DataError::NoData { symbol }) => {
                warn!(ticker, symbol = %symbol, "no data");
                return Ok(Step::NoData);
            }
            Err(e) => return Err(e).with_context(|| format!("failed to load history for {ticker}")),
        };

        let forecast = match self.forecaster.run(&history.symbol, history.bars) {
            Ok(forecast) => forecast,
            Err(ForecastError::EmptyHistory { .. }) => return Ok(Step::NoData),
            Err(e) => {
                return Err(e).with_context(|| format!("forecast failed for {}", history.symbol))
            }
        };

        self.presenter
            .present(&forecast)
            .with_context(|| format!("failed to display chart for {}", history.symbol))?;

        if let Some(dir) = &self.export_dir {
            let path = export_forecast(dir, &forecast)
                .with_context(|| format!("failed to export {}", history.symbol))?;
            info!(path = %path.display(), "exported");
        }

        Ok(Step::Presented {
            symbol: history.symbol,
        })
    }
}
