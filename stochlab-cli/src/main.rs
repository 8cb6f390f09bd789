//! StochLab CLI: interactive stochastic oscillator price predictor.
//!
//! Prompts for ticker symbols, forecasts the next 30 days of closes from the
//! %K / %D oscillator and shows the result as a two-panel terminal chart.
//! Type `exit` to quit.

mod present;
mod session;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use stochlab_core::config::StochConfig;
use stochlab_core::data::{CircuitBreaker, DataProvider, HistoryLoader, YahooProvider};
use stochlab_core::forecast::Forecaster;
use stochlab_tui::{ChartViewer, Theme};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::present::{TerminalChart, TextSummary};
use crate::session::{ChartPresenter, Session};

#[derive(Parser, Debug)]
#[command(
    name = "stochlab",
    about = "Stochastic oscillator price predictor for daily stock data"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the forecast noise. Unseeded runs differ every time.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of days to forecast.
    #[arg(long)]
    horizon: Option<usize>,

    /// Offline mode: serve from the cache only, never touch the network.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Cache directory. Defaults to ./data.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Do not read or write the Parquet cache.
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Also write <TICKER>_forecast.csv into this directory.
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Print a text summary instead of opening the chart viewer.
    #[arg(long, default_value_t = false)]
    no_chart: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = build_config(&cli)?;
    info!(
        horizon = config.forecast.horizon,
        offline = config.data.offline,
        cache = config.data.use_cache,
        "starting"
    );

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker).context("failed to build HTTP client")?;
    let loader = HistoryLoader::new(provider, &config.data);
    let forecaster = Forecaster::new(&config);

    let stdin = io::stdin();
    let stdout = io::stdout();
    if cli.no_chart {
        let presenter = TextSummary::new(io::stdout());
        run_session(loader, forecaster, presenter, cli.export_dir, stdin.lock(), stdout.lock())
    } else {
        let presenter = TerminalChart::new(ChartViewer::new(Theme::plot()), config.signals);
        run_session(loader, forecaster, presenter, cli.export_dir, stdin.lock(), stdout.lock())
    }
}

fn run_session<P, C, R, W>(
    loader: HistoryLoader<P>,
    forecaster: Forecaster,
    presenter: C,
    export_dir: Option<PathBuf>,
    input: R,
    output: W,
) -> Result<()>
where
    P: DataProvider,
    C: ChartPresenter,
    R: BufRead,
    W: Write,
{
    let mut session = Session::new(loader, forecaster, presenter).with_export_dir(export_dir);
    session.run(input, output)?;
    Ok(())
}

/// Log to stderr; `STOCHLAB_LOG` takes the usual `EnvFilter` directives.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STOCHLAB_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

/// Config file (or defaults) with command-line overrides applied.
fn build_config(cli: &Cli) -> Result<StochConfig> {
    let mut config = match &cli.config {
        Some(path) => StochConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StochConfig::default(),
    };

    if let Some(seed) = cli.seed {
        config.forecast.seed = Some(seed);
    }
    if let Some(horizon) = cli.horizon {
        config.forecast.horizon = horizon;
    }
    if cli.offline {
        config.data.offline = true;
    }
    if let Some(dir) = &cli.cache_dir {
        config.data.cache_dir = dir.clone();
    }
    if cli.no_cache {
        config.data.use_cache = false;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stochlab").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_without_flags() {
        let config = build_config(&parse(&[])).unwrap();
        assert_eq!(config.forecast.horizon, 30);
        assert_eq!(config.forecast.seed, None);
        assert_eq!(config.data.cache_dir, PathBuf::from("data"));
        assert!(config.data.use_cache);
        assert!(!config.data.offline);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stochlab.toml");
        std::fs::write(&path, "[forecast]\nhorizon = 10\nseed = 1\n\n[data]\noffline = false\n")
            .unwrap();

        let cli = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--seed",
            "42",
            "--offline",
            "--cache-dir",
            "/tmp/stoch-cache",
            "--no-cache",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.forecast.horizon, 10);
        assert_eq!(config.forecast.seed, Some(42));
        assert!(config.data.offline);
        assert!(!config.data.use_cache);
        assert_eq!(config.data.cache_dir, PathBuf::from("/tmp/stoch-cache"));
    }

    #[test]
    fn zero_horizon_is_rejected() {
        assert!(build_config(&parse(&["--horizon", "0"])).is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = build_config(&parse(&["--config", "/nonexistent/stochlab.toml"])).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load config"));
    }

    #[test]
    fn no_chart_flag() {
        assert!(parse(&["--no-chart"]).no_chart);
        assert!(!parse(&[]).no_chart);
    }
}
