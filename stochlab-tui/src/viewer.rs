//! Blocking full-screen chart viewer.
//!
//! Enters raw mode and the alternate screen, redraws on every event
//! (including resizes) and returns once the user presses q, Esc or Enter.
//! The terminal is restored on return and on panic.

use std::io::{self, stdout};
use std::sync::Once;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use stochlab_core::forecast::Forecast;
use stochlab_core::signals::SignalThresholds;
use tracing::debug;

use crate::chart;
use crate::theme::Theme;

static PANIC_HOOK: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the panic.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stderr(), LeaveAlternateScreen);
            default_hook(info);
        }));
    });
}

/// Leave raw mode and the alternate screen. Both steps run even if the first fails.
fn restore_terminal() -> Result<()> {
    let raw = disable_raw_mode().context("failed to disable raw mode");
    let screen = execute!(io::stdout(), LeaveAlternateScreen)
        .context("failed to leave alternate screen");
    raw.and(screen)
}

/// Run `restore` whatever `result` is; the first error wins.
fn finish<T>(result: Result<T>, restore: impl FnOnce() -> Result<()>) -> Result<T> {
    let restored = restore();
    let value = result?;
    restored.map(|()| value)
}

/// Keys that close the viewer.
pub fn is_close_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc | KeyCode::Enter => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChartViewer {
    theme: Theme,
}

impl ChartViewer {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    /// Show the chart and block until the user closes it.
    pub fn show(&self, forecast: &Forecast, thresholds: SignalThresholds) -> Result<()> {
        debug!(symbol = forecast.symbol(), "opening chart viewer");
        install_panic_hook();

        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e).context("failed to enter alternate screen");
        }

        let result = Terminal::new(CrosstermBackend::new(stdout))
            .context("failed to create terminal")
            .and_then(|mut terminal| {
                let drawn = terminal
                    .clear()
                    .context("failed to clear terminal")
                    .and_then(|()| self.run(&mut terminal, forecast, thresholds));
                let _ = terminal.show_cursor();
                drawn
            });

        debug!(symbol = forecast.symbol(), "chart viewer closed");
        finish(result, restore_terminal)
    }

    fn run<B: Backend>(
        &self,
        terminal: &mut Terminal<B>,
        forecast: &Forecast,
        thresholds: SignalThresholds,
    ) -> Result<()> {
        loop {
            terminal.draw(|f| chart::render(f, forecast, thresholds, &self.theme))?;

            if let Event::Key(key) = event::read()? {
                if is_close_key(&key) {
                    return Ok(());
                }
            }
        }
    }
}
