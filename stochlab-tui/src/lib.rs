//! StochLab TUI: terminal chart for a stochastic oscillator forecast.
//!
//! - `chart`: two-panel ratatui widget (price + oscillator)
//! - `viewer`: blocking full-screen viewer around the widget
//! - `theme`: line and marker colors

pub mod chart;
pub mod theme;
pub mod viewer;

pub use chart::{ChartSeries, ForecastChart};
pub use theme::Theme;
pub use viewer::ChartViewer;
