//! Chart presenters: the full-screen viewer and a plain-text fallback.

use std::io::Write;

use anyhow::Result;
use stochlab_core::forecast::{Forecast, Trend};
use stochlab_core::signals::SignalThresholds;
use stochlab_tui::ChartViewer;

use crate::session::ChartPresenter;

pub struct TerminalChart {
    viewer: ChartViewer,
    thresholds: SignalThresholds,
}

impl TerminalChart {
    pub fn new(viewer: ChartViewer, thresholds: SignalThresholds) -> Self {
        Self { viewer, thresholds }
    }
}

impl ChartPresenter for TerminalChart {
    fn present(&mut self, forecast: &Forecast) -> Result<()> {
        self.viewer.show(forecast, self.thresholds)
    }
}

/// One summary block per forecast, for `--no-chart` and non-interactive use.
pub struct TextSummary<W: Write> {
    out: W,
}

impl<W: Write> TextSummary<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChartPresenter for TextSummary<W> {
    fn present(&mut self, forecast: &Forecast) -> Result<()> {
        let frame = &forecast.frame;
        let trend = match forecast.trend {
            Trend::Up => "up",
            Trend::Down => "down",
        };

        writeln!(self.out, "{}", forecast.symbol())?;
        if let (Some(date), Some(close)) = (frame.last_actual_date(), frame.last_actual_close()) {
            writeln!(self.out, "  last close      {date}  {close:.2}")?;
        }
        if let (Some(date), Some(close)) = (frame.last_date(), forecast.final_close()) {
            writeln!(self.out, "  predicted close {date}  {close:.2} ({trend})")?;
        }
        writeln!(
            self.out,
            "  horizon {} days, noise sigma {:.4}",
            frame.forecast_len(),
            forecast.noise_sigma
        )?;
        for signal in &forecast.signals {
            writeln!(
                self.out,
                "  {} {} at %D {:.1}{}",
                signal.date,
                signal.kind.label(),
                signal.value,
                if signal.predicted { " (predicted)" } else { "" }
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}
