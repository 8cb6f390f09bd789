//! StochasticFrame: the date-indexed price table with %K / %D columns.
//!
//! Rows `0..history_len` are actual bars; any rows after that are predicted
//! bars appended by the forecaster. The derived columns always have the same
//! length as `bars` and hold `f64::NAN` wherever the rolling windows are not
//! yet warmed up (or the price range is zero).

use crate::domain::Bar;
use crate::indicators::Stochastic;
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct StochasticFrame {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub percent_k: Vec<f64>,
    pub percent_d: Vec<f64>,
    history_len: usize,
}

impl StochasticFrame {
    /// Build a frame from actual bars and compute its oscillator columns.
    ///
    /// `bars` must already be sorted ascending by date.
    pub fn from_history(symbol: impl Into<String>, bars: Vec<Bar>, stoch: &Stochastic) -> Self {
        let (percent_k, percent_d) = stoch.compute_both(&bars);
        let history_len = bars.len();
        Self {
            symbol: symbol.into(),
            bars,
            percent_k,
            percent_d,
            history_len,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Number of actual (non-predicted) rows.
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Number of predicted rows.
    pub fn forecast_len(&self) -> usize {
        self.bars.len() - self.history_len
    }

    pub fn history(&self) -> &[Bar] {
        &self.bars[..self.history_len]
    }

    pub fn forecast(&self) -> &[Bar] {
        &self.bars[self.history_len..]
    }

    pub fn is_predicted(&self, index: usize) -> bool {
        index >= self.history_len
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn last_actual_date(&self) -> Option<NaiveDate> {
        self.history().last().map(|b| b.date)
    }

    pub fn last_actual_close(&self) -> Option<f64> {
        self.history().last().map(|b| b.close)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// Last (%K, %D) pair of the actual history.
    pub fn last_actual_oscillator(&self) -> Option<(f64, f64)> {
        let i = self.history_len.checked_sub(1)?;
        Some((self.percent_k[i], self.percent_d[i]))
    }

    /// Append predicted bars after the history. The oscillator columns are
    /// padded with NaN until `recompute` is called.
    pub fn extend_with_forecast(&mut self, predicted: impl IntoIterator<Item = Bar>) {
        for bar in predicted {
            self.bars.push(bar);
            self.percent_k.push(f64::NAN);
            self.percent_d.push(f64::NAN);
        }
    }

    /// Recompute %K / %D over every row, history and forecast alike.
    pub fn recompute(&mut self, stoch: &Stochastic) {
        let (k, d) = stoch.compute_both(&self.bars);
        self.percent_k = k;
        self.percent_d = d;
    }
}
