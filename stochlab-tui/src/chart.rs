//! Two-panel forecast chart.
//!
//! Top: actual close (blue) and predicted close (green if rising, red if
//! falling) joined to the last actual point. Bottom: %K, %D, the
//! overbought / oversold reference lines and buy / sell markers.
//! Both panels share the date axis; x is days since the first bar.

use chrono::{Duration, NaiveDate};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition, Paragraph, Widget},
    Frame,
};
use stochlab_core::forecast::Forecast;
use stochlab_core::signals::{SignalKind, SignalThresholds};

use crate::theme::Theme;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
const CLOSE_HINT: &str = " q / Esc / Enter: close ";

/// Chart-space points derived from a forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub first_date: NaiveDate,
    pub x_max: f64,
    pub actual: Vec<(f64, f64)>,
    /// Starts at the last actual point.
    pub predicted: Vec<(f64, f64)>,
    pub percent_k: Vec<(f64, f64)>,
    pub percent_d: Vec<(f64, f64)>,
    pub buys: Vec<(f64, f64)>,
    pub sells: Vec<(f64, f64)>,
}

impl ChartSeries {
    pub fn from_forecast(forecast: &Forecast) -> Option<Self> {
        let frame = &forecast.frame;
        let first_date = frame.first_date()?;
        let x_of = |date: NaiveDate| (date - first_date).num_days() as f64;

        let points = |range: std::ops::Range<usize>| -> Vec<(f64, f64)> {
            frame.bars[range]
                .iter()
                .map(|b| (x_of(b.date), b.close))
                .collect()
        };
        let actual = points(0..frame.history_len());
        let mut predicted: Vec<(f64, f64)> = actual.last().copied().into_iter().collect();
        predicted.extend(points(frame.history_len()..frame.len()));

        let defined = |values: &[f64]| -> Vec<(f64, f64)> {
            frame
                .bars
                .iter()
                .zip(values)
                .filter(|(_, v)| !v.is_nan())
                .map(|(b, &v)| (x_of(b.date), v))
                .collect()
        };

        let marks = |kind: SignalKind| -> Vec<(f64, f64)> {
            forecast
                .signals
                .iter()
                .filter(|s| s.kind == kind)
                .map(|s| (x_of(s.date), s.value))
                .collect()
        };

        Some(Self {
            first_date,
            x_max: frame.last_date().map_or(0.0, x_of),
            actual,
            predicted,
            percent_k: defined(&frame.percent_k),
            percent_d: defined(&frame.percent_d),
            buys: marks(SignalKind::Buy),
            sells: marks(SignalKind::Sell),
        })
    }

    /// Date shown at chart x coordinate `x`.
    pub fn date_at(&self, x: f64) -> NaiveDate {
        self.first_date + Duration::days(x.round() as i64)
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, self.x_max.max(1.0)]
    }

    fn x_labels(&self) -> Vec<String> {
        let [lo, hi] = self.x_bounds();
        [lo, (lo + hi) / 2.0, hi]
            .iter()
            .map(|&x| self.date_at(x).format(DATE_FORMAT).to_string())
            .collect()
    }

    fn price_bounds(&self) -> [f64; 2] {
        padded_bounds(self.actual.iter().chain(&self.predicted).map(|&(_, y)| y))
    }
}

/// Min / max of the finite values with 5% padding; never a zero-width range.
pub fn padded_bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return [0.0, 1.0];
    }
    let range = hi - lo;
    let pad = if range > 0.0 {
        range * 0.05
    } else {
        (lo.abs() * 0.05).max(1.0)
    };
    [lo - pad, hi + pad]
}

pub struct ForecastChart<'a> {
    forecast: &'a Forecast,
    thresholds: SignalThresholds,
    theme: &'a Theme,
}

impl<'a> ForecastChart<'a> {
    pub fn new(forecast: &'a Forecast, thresholds: SignalThresholds, theme: &'a Theme) -> Self {
        Self {
            forecast,
            thresholds,
            theme,
        }
    }

    fn axis_labels(&self, labels: Vec<String>) -> Vec<Span<'static>> {
        labels
            .into_iter()
            .map(|l| Span::styled(l, self.theme.axis()))
            .collect()
    }

    fn render_price(&self, series: &ChartSeries, area: Rect, buf: &mut Buffer) {
        let theme = self.theme;
        let trend_color = theme.trend_color(self.forecast.trend);
        let [y_lo, y_hi] = series.price_bounds();

        let datasets = vec![
            Dataset::default()
                .name("Actual")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.blue))
                .data(&series.actual),
            Dataset::default()
                .name("Predicted")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(trend_color))
                .data(&series.predicted),
        ];

        let last = self.forecast.frame.last_actual_close().unwrap_or(f64::NAN);
        let fin = self.forecast.final_close().unwrap_or(f64::NAN);
        let summary = format!(
            " last close {last:.2} | day {} forecast {fin:.2} ",
            self.forecast.predicted_closes.len()
        );

        let block = Block::default()
            .title(
                Line::from(format!(
                    " {} Stochastic Oscillator Price Prediction ",
                    self.forecast.symbol()
                ))
                .style(theme.title().add_modifier(Modifier::BOLD))
                .centered(),
            )
            .title_bottom(Line::from(Span::styled(summary, Style::default().fg(trend_color))).right_aligned())
            .borders(Borders::ALL)
            .border_style(theme.axis())
            .style(Style::default().bg(theme.background));

        let y_mid = (y_lo + y_hi) / 2.0;
        let chart = Chart::new(datasets)
            .block(block)
            .legend_position(Some(LegendPosition::TopLeft))
            .x_axis(
                Axis::default()
                    .title(Span::styled("Date", theme.axis()))
                    .style(theme.axis())
                    .bounds(series.x_bounds())
                    .labels(self.axis_labels(series.x_labels())),
            )
            .y_axis(
                Axis::default()
                    .title(Span::styled("Price (USD)", theme.axis()))
                    .style(theme.axis())
                    .bounds([y_lo, y_hi])
                    .labels(self.axis_labels(vec![
                        format!("{y_lo:.2}"),
                        format!("{y_mid:.2}"),
                        format!("{y_hi:.2}"),
                    ])),
            );

        chart.render(area, buf);
    }

    fn render_oscillator(&self, series: &ChartSeries, area: Rect, buf: &mut Buffer) {
        let theme = self.theme;
        let [x_lo, x_hi] = series.x_bounds();
        let overbought = [(x_lo, self.thresholds.overbought), (x_hi, self.thresholds.overbought)];
        let oversold = [(x_lo, self.thresholds.oversold), (x_hi, self.thresholds.oversold)];

        let mut datasets = vec![
            Dataset::default()
                .name("%K")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.orange))
                .data(&series.percent_k),
            Dataset::default()
                .name("%D")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.blue))
                .data(&series.percent_d),
            Dataset::default()
                .name(format!("Overbought ({})", self.thresholds.overbought))
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.red))
                .data(&overbought),
            Dataset::default()
                .name(format!("Oversold ({})", self.thresholds.oversold))
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.green))
                .data(&oversold),
        ];
        for (kind, points) in [(SignalKind::Buy, &series.buys), (SignalKind::Sell, &series.sells)] {
            if points.is_empty() {
                continue;
            }
            datasets.push(
                Dataset::default()
                    .name(format!("{} Signal", kind.label()))
                    .marker(symbols::Marker::Block)
                    .graph_type(GraphType::Scatter)
                    .style(
                        Style::default()
                            .fg(theme.signal_color(kind))
                            .add_modifier(Modifier::BOLD),
                    )
                    .data(points),
            );
        }

        let block = Block::default()
            .title(Line::from(" %K / %D ").style(theme.title()).centered())
            .borders(Borders::ALL)
            .border_style(theme.axis())
            .style(Style::default().bg(theme.background));

        let chart = Chart::new(datasets)
            .block(block)
            .legend_position(Some(LegendPosition::TopLeft))
            .hidden_legend_constraints((Constraint::Ratio(1, 3), Constraint::Ratio(3, 4)))
            .x_axis(
                Axis::default()
                    .title(Span::styled("Date", theme.axis()))
                    .style(theme.axis())
                    .bounds([x_lo, x_hi])
                    .labels(self.axis_labels(series.x_labels())),
            )
            .y_axis(
                Axis::default()
                    .title(Span::styled("Stochastic Oscillator", theme.axis()))
                    .style(theme.axis())
                    .bounds([0.0, 100.0])
                    .labels(self.axis_labels(vec!["0".into(), "50".into(), "100".into()])),
            );

        chart.render(area, buf);
    }
}

impl Widget for ForecastChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [price_area, osc_area, hint_area] = Layout::vertical([
            Constraint::Percentage(60),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .areas(area);

        match ChartSeries::from_forecast(self.forecast) {
            Some(series) => {
                self.render_price(&series, price_area, buf);
                self.render_oscillator(&series, osc_area, buf);
            }
            None => {
                Paragraph::new(format!("No data for {}", self.forecast.symbol()))
                    .style(self.theme.axis())
                    .render(price_area, buf);
            }
        }

        Paragraph::new(Span::styled(CLOSE_HINT, self.theme.axis()))
            .right_aligned()
            .render(hint_area, buf);
    }
}

/// Draw the chart over the whole frame.
pub fn render(f: &mut Frame, forecast: &Forecast, thresholds: SignalThresholds, theme: &Theme) {
    f.render_widget(ForecastChart::new(forecast, thresholds, theme), f.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ratatui::{backend::TestBackend, Terminal};
    use stochlab_core::config::StochConfig;
    use stochlab_core::domain::Bar;
    use stochlab_core::forecast::Forecaster;

    fn bars(n: usize) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        (0..n)
            .map(|i| {
                let close = 80.0 + (i as f64 * 0.25).sin() * 6.0;
                Bar {
                    date: base + Duration::days(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 100,
                }
            })
            .collect()
    }

    fn forecast(n: usize) -> Forecast {
        let mut config = StochConfig::default();
        config.forecast.seed = Some(17);
        Forecaster::new(&config).run("TEST", bars(n)).unwrap()
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> Vec<String> {
        let buf = terminal.backend().buffer();
        (0..buf.area.height)
            .map(|y| {
                (0..buf.area.width)
                    .map(|x| buf[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn series_join_prediction_to_last_actual() {
        let fc = forecast(60);
        let s = ChartSeries::from_forecast(&fc).unwrap();

        assert_eq!(s.actual.len(), 60);
        assert_eq!(s.predicted.len(), 31);
        assert_eq!(s.predicted[0], *s.actual.last().unwrap());
        assert_eq!(s.x_max, 89.0);
        assert_eq!(s.date_at(s.x_max), fc.frame.last_date().unwrap());
        assert!(s.percent_k.iter().all(|&(_, v)| (0.0..=100.0).contains(&v)));
        assert_eq!(s.percent_k[0].0, 13.0);
    }

    #[test]
    fn x_labels_are_formatted_dates() {
        let s = ChartSeries::from_forecast(&forecast(40)).unwrap();
        let labels = s.x_labels();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0], "2024-01-02");
        assert_eq!(labels[2], s.date_at(s.x_max).format(DATE_FORMAT).to_string());
    }

    #[test]
    fn renders_both_panels() {
        let fc = forecast(120);
        let mut terminal = Terminal::new(TestBackend::new(160, 48)).unwrap();
        terminal
            .draw(|f| render(f, &fc, SignalThresholds::default(), &Theme::default()))
            .unwrap();

        let rows = screen_text(&terminal);
        let all = rows.join("\n");
        assert!(all.contains("TEST Stochastic Oscillator Price Prediction"));
        assert!(all.contains("Price (USD)"));
        assert!(all.matches("Stochastic Oscillator").count() >= 2);
        assert!(all.contains("q / Esc / Enter: close"));
        assert!(all.contains("Actual"));
        assert!(all.contains("Predicted"));
    }

    #[test]
    fn renders_in_a_tiny_terminal() {
        let fc = forecast(30);
        let mut terminal = Terminal::new(TestBackend::new(20, 8)).unwrap();
        terminal
            .draw(|f| render(f, &fc, SignalThresholds::default(), &Theme::default()))
            .unwrap();
    }

    #[test]
    fn flat_values_get_nonzero_bounds() {
        let [lo, hi] = padded_bounds([5.0, 5.0].into_iter());
        assert!(lo < 5.0 && hi > 5.0);
        assert_eq!(padded_bounds(std::iter::empty()), [0.0, 1.0]);
        assert_eq!(padded_bounds([f64::NAN].into_iter()), [0.0, 1.0]);
    }

    proptest! {
        #[test]
        fn bounds_contain_every_finite_value(
            values in prop::collection::vec(prop_oneof![Just(f64::NAN), -1e6..1e6_f64], 0..50)
        ) {
            let [lo, hi] = padded_bounds(values.iter().copied());
            prop_assert!(lo < hi);
            for v in values.iter().filter(|v| v.is_finite()) {
                prop_assert!(lo <= *v && *v <= hi);
            }
        }
    }
}
