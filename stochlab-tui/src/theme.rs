//! Chart color tokens.
//!
//! Line colors follow the usual plotting palette: blue actual price, orange
//! %K, blue %D, green for bullish marks (oversold line, buy signals, rising
//! forecast) and red for bearish ones.

use ratatui::style::{Color, Style};
use stochlab_core::forecast::Trend;
use stochlab_core::signals::SignalKind;

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    /// Near-black background
    pub background: Color,
    /// Historical close and %D line
    pub blue: Color,
    /// %K line
    pub orange: Color,
    /// Rising forecast, oversold line, buy markers
    pub green: Color,
    /// Falling forecast, overbought line, sell markers
    pub red: Color,
    /// Axes and hints
    pub muted: Color,
    pub text_primary: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::plot()
    }
}

impl Theme {
    pub fn plot() -> Self {
        Self {
            background: Color::Rgb(18, 18, 20),
            blue: Color::Rgb(31, 119, 180),
            orange: Color::Rgb(255, 127, 14),
            green: Color::Rgb(44, 160, 44),
            red: Color::Rgb(214, 39, 40),
            muted: Color::Rgb(100, 149, 237),
            text_primary: Color::White,
        }
    }

    /// Color of the predicted price line.
    pub fn trend_color(&self, trend: Trend) -> Color {
        match trend {
            Trend::Up => self.green,
            Trend::Down => self.red,
        }
    }

    pub fn signal_color(&self, kind: SignalKind) -> Color {
        match kind {
            SignalKind::Buy => self.green,
            SignalKind::Sell => self.red,
        }
    }

    pub fn axis(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn title(&self) -> Style {
        Style::default().fg(self.text_primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_color() {
        let theme = Theme::default();
        assert_eq!(theme.trend_color(Trend::Up), theme.green);
        assert_eq!(theme.trend_color(Trend::Down), theme.red);
    }

    #[test]
    fn test_signal_color() {
        let theme = Theme::default();
        assert_eq!(theme.signal_color(SignalKind::Buy), theme.green);
        assert_eq!(theme.signal_color(SignalKind::Sell), theme.red);
    }

    #[test]
    fn test_k_and_d_are_distinct() {
        let theme = Theme::default();
        assert_ne!(theme.orange, theme.blue);
    }
}
