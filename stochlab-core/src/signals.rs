//! Buy / sell markers from %K crossing %D outside the neutral band.
//!
//! - Buy: %K crosses above %D while %K is below the oversold threshold.
//! - Sell: %K crosses below %D while %K is above the overbought threshold.
//!
//! Any comparison involving NaN is false, so warm-up rows never signal.

use crate::domain::StochasticFrame;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            overbought: 80.0,
            oversold: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    Buy,
    Sell,
}

impl SignalKind {
    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::Buy => "Buy",
            SignalKind::Sell => "Sell",
        }
    }
}

/// A crossover marker, plotted at the %D value of its row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSignal {
    pub index: usize,
    pub date: NaiveDate,
    pub kind: SignalKind,
    pub value: f64,
    pub predicted: bool,
}

/// Scan the %K / %D columns for crossover signals.
pub fn detect(k: &[f64], d: &[f64], thresholds: &SignalThresholds) -> Vec<(usize, SignalKind)> {
    let n = k.len().min(d.len());
    (1..n)
        .filter_map(|i| {
            let crossed_up = k[i - 1] < d[i - 1] && k[i] > d[i];
            let crossed_down = k[i - 1] > d[i - 1] && k[i] < d[i];
            if crossed_up && k[i] < thresholds.oversold {
                Some((i, SignalKind::Buy))
            } else if crossed_down && k[i] > thresholds.overbought {
                Some((i, SignalKind::Sell))
            } else {
                None
            }
        })
        .collect()
}

/// Crossover signals for every row of a frame, forecast rows included.
pub fn frame_signals(frame: &StochasticFrame, thresholds: &SignalThresholds) -> Vec<CrossSignal> {
    detect(&frame.percent_k, &frame.percent_d, thresholds)
        .into_iter()
        .map(|(index, kind)| CrossSignal {
            index,
            date: frame.bars[index].date,
            kind,
            value: frame.percent_d[index],
            predicted: frame.is_predicted(index),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f64 = f64::NAN;

    #[test]
    fn buy_below_oversold() {
        let k = [10.0, 15.0];
        let d = [12.0, 13.0];
        let s = detect(&k, &d, &SignalThresholds::default());
        assert_eq!(s, vec![(1, SignalKind::Buy)]);
    }

    #[test]
    fn cross_up_above_oversold_is_ignored() {
        let k = [30.0, 40.0];
        let d = [35.0, 36.0];
        assert!(detect(&k, &d, &SignalThresholds::default()).is_empty());
    }

    #[test]
    fn sell_above_overbought() {
        let k = [90.0, 84.0];
        let d = [88.0, 86.0];
        let s = detect(&k, &d, &SignalThresholds::default());
        assert_eq!(s, vec![(1, SignalKind::Sell)]);
    }

    #[test]
    fn cross_down_below_overbought_is_ignored() {
        let k = [70.0, 60.0];
        let d = [65.0, 62.0];
        assert!(detect(&k, &d, &SignalThresholds::default()).is_empty());
    }

    #[test]
    fn touching_is_not_crossing() {
        let k = [10.0, 12.0, 15.0];
        let d = [12.0, 12.0, 13.0];
        // Row 1: k == d, so neither row 1 nor row 2 is a strict crossing.
        assert!(detect(&k, &d, &SignalThresholds::default()).is_empty());
    }

    #[test]
    fn nan_rows_never_signal() {
        let k = [NAN, 15.0, NAN, 10.0];
        let d = [NAN, 13.0, 12.0, NAN];
        assert!(detect(&k, &d, &SignalThresholds::default()).is_empty());
    }

    #[test]
    fn custom_thresholds() {
        let t = SignalThresholds {
            overbought: 60.0,
            oversold: 40.0,
        };
        let k = [30.0, 38.0, 70.0, 64.0];
        let d = [32.0, 34.0, 66.0, 66.0];
        let s = detect(&k, &d, &t);
        assert_eq!(s, vec![(1, SignalKind::Buy), (3, SignalKind::Sell)]);
    }
}
