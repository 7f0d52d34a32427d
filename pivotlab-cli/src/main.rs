//! PivotLab CLI: level, classification, replay, trend and report commands.
//!
//! Commands:
//! - `levels`: compute the level set for one reference bar
//! - `classify`: classify a price against a reference bar (plus exit override)
//! - `replay`: replay intraday candles through the engine into a JSONL store
//! - `trend`: run the rolling trend job over intraday candles
//! - `report`: export paired trades and the trend tape

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;

use pivotlab_core::classifier::{classify, exit_override};
use pivotlab_core::data::{BrokerSession, MarketDataSource};
use pivotlab_core::domain::{Bar, Signal};
use pivotlab_core::levels::{buffer_from_bc, compute_levels, Buffer, LevelRounding};
use pivotlab_core::store::{TradeEventStore, TrendStore};
use pivotlab_runner::data_loader::{load_bars_csv, CsvMarketData};
use pivotlab_runner::{replay_many, run_trend_job, save_report, JsonlStore, PivotConfig};

#[derive(Parser)]
#[command(
    name = "pivotlab",
    about = "PivotLab CLI: pivot-level signal engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoundingArg {
    Independent,
    Chained,
}

impl From<RoundingArg> for LevelRounding {
    fn from(arg: RoundingArg) -> Self {
        match arg {
            RoundingArg::Independent => LevelRounding::Independent,
            RoundingArg::Chained => LevelRounding::Chained,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute pivot, CPR and outer levels from a reference bar.
    Levels {
        #[arg(long)]
        high: Decimal,
        #[arg(long)]
        low: Decimal,
        #[arg(long)]
        close: Decimal,
        /// Rounding order. Defaults to the config value.
        #[arg(long, value_enum)]
        rounding: Option<RoundingArg>,
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Classify one price against a reference bar.
    Classify {
        #[arg(long)]
        high: Decimal,
        #[arg(long)]
        low: Decimal,
        #[arg(long)]
        close: Decimal,
        #[arg(long)]
        price: Decimal,
        /// Fixed buffer width. Defaults to the bc-derived buffer.
        #[arg(long)]
        buffer: Option<Decimal>,
        /// Candle open, for the exit override.
        #[arg(long, requires = "last_signal")]
        open: Option<Decimal>,
        /// Signal of the last persisted event (buy, sell, exit).
        #[arg(long, requires = "open")]
        last_signal: Option<Signal>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Replay intraday candles through the decision engine.
    Replay {
        #[arg(long)]
        instrument: String,
        /// CSV of daily bars (reference source).
        #[arg(long)]
        daily: PathBuf,
        /// CSV of intraday candles.
        #[arg(long)]
        candles: PathBuf,
        /// Directory holding the JSONL store.
        #[arg(long, default_value = "store")]
        store: PathBuf,
        /// Session date (YYYY-MM-DD). Defaults to every date in the candle file.
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the rolling trend job and persist trend flips.
    Trend {
        #[arg(long)]
        instrument: String,
        #[arg(long)]
        candles: PathBuf,
        /// Previous session's candles, used to fill early windows.
        #[arg(long)]
        prior: Option<PathBuf>,
        #[arg(long, default_value = "store")]
        store: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Export paired trades and the trend tape.
    Report {
        #[arg(long)]
        instrument: String,
        #[arg(long, default_value = "store")]
        store: PathBuf,
        #[arg(long, default_value = "reports")]
        out: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pivotlab=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Levels {
            high,
            low,
            close,
            rounding,
            config,
        } => run_levels(high, low, close, rounding, config.as_deref()),
        Commands::Classify {
            high,
            low,
            close,
            price,
            buffer,
            open,
            last_signal,
            config,
        } => run_classify(
            reference_bar(high, low, close),
            price,
            buffer,
            open.zip(last_signal),
            config.as_deref(),
        ),
        Commands::Replay {
            instrument,
            daily,
            candles,
            store,
            date,
            config,
        } => run_replay(&instrument, &daily, &candles, &store, date, config.as_deref()),
        Commands::Trend {
            instrument,
            candles,
            prior,
            store,
            config,
        } => run_trend(&instrument, &candles, prior.as_deref(), &store, config.as_deref()),
        Commands::Report {
            instrument,
            store,
            out,
            config,
        } => run_report(&instrument, &store, &out, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<PivotConfig> {
    match path {
        Some(p) => PivotConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(PivotConfig::default()),
    }
}

fn reference_bar(high: Decimal, low: Decimal, close: Decimal) -> Bar {
    // Open is not used by level math; the close stands in for it.
    Bar::new(Utc::now(), close, high, low, close)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_levels(
    high: Decimal,
    low: Decimal,
    close: Decimal,
    rounding: Option<RoundingArg>,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let rounding = rounding.map_or(config.levels.rounding, LevelRounding::from);
    let levels = compute_levels(&reference_bar(high, low, close), rounding)?;
    print_json(&json!({
        "rounding": rounding,
        "levels": levels,
        "buffer": buffer_from_bc(levels.bc, config.levels.buffer_pct),
    }))
}

fn run_classify(
    bar: Bar,
    price: Decimal,
    buffer: Option<Decimal>,
    position: Option<(Decimal, Signal)>,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let settings = config.engine_settings();
    let levels = compute_levels(&bar, settings.rounding)?;
    let width = buffer
        .or(settings.buffer_override)
        .unwrap_or_else(|| buffer_from_bc(levels.bc, settings.buffer_pct));
    let buffer = Buffer::new(width).context("buffer rounds to zero; pass --buffer")?;

    let result = classify(price, &levels, buffer, settings.classifier);
    let exit = position.map(|(open, last)| exit_override(price, open, last, &levels, buffer));

    print_json(&json!({
        "levels": levels,
        "buffer": buffer,
        "classification": result,
        "exit_override": exit,
    }))
}

fn run_replay(
    instrument: &str,
    daily: &Path,
    candles: &Path,
    store_dir: &Path,
    date: Option<NaiveDate>,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let source = CsvMarketData::from_files(instrument, daily, candles)?;
    let store = JsonlStore::new(store_dir);

    let dates = match date {
        Some(d) => vec![d],
        None => source.session_dates(instrument),
    };
    if dates.is_empty() {
        bail!("no intraday candles for '{instrument}' in {}", candles.display());
    }

    info!(instrument, source = source.name(), sessions = dates.len(), config_id = %config.config_id(), "replaying");
    let sessions: Vec<(String, NaiveDate)> =
        dates.into_iter().map(|d| (instrument.to_string(), d)).collect();

    let mut summaries = Vec::new();
    for result in replay_many(
        &source,
        &BrokerSession::anonymous(),
        &store,
        &config,
        &sessions,
    ) {
        summaries.push(result?);
    }

    print_json(&serde_json::to_value(&summaries)?)
}

fn run_trend(
    instrument: &str,
    candles: &Path,
    prior: Option<&Path>,
    store_dir: &Path,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let candles = load_bars_csv(candles)?;
    let prior = match prior {
        Some(p) => load_bars_csv(p)?,
        None => Vec::new(),
    };
    let store = JsonlStore::new(store_dir);

    let summary = run_trend_job(&store, &config.trend, instrument, &prior, &candles)?;
    print_json(&serde_json::to_value(&summary)?)
}

fn run_report(instrument: &str, store_dir: &Path, out: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let tz = config.report_timezone()?;
    let store = JsonlStore::new(store_dir);

    let events = store.events(instrument)?;
    let trends = store.trends(instrument)?;
    if events.is_empty() && trends.is_empty() {
        bail!("no trades or trend points stored for '{instrument}' in {}", store_dir.display());
    }

    let paths = save_report(instrument, &events, &trends, tz, out)?;
    for path in &paths {
        println!("{}", path.display());
    }
    Ok(())
}
