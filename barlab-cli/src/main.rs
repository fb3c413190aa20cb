//! barlab CLI — load CSV bars, run a backtest, print the equity report.
//!
//! Commands:
//! - `run` — replay a CSV of OHLCV bars through the EMA-cross example
//!   strategy; account/sizing/date-range settings come from an optional TOML
//!   config file with flag overrides.

use anyhow::{bail, Context as _, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use barlab_core::broker::Broker;
use barlab_core::domain::{Account, Bar, CommissionSchema};
use barlab_core::engine::{RunResult, Scheduler};
use barlab_core::feed::MemoryFeed;
use barlab_core::indicators::Pipeline;
use barlab_core::strategies::{MaCross, MaCrossParams};

#[derive(Parser)]
#[command(name = "barlab", about = "barlab CLI — bar-replay backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV data file through the example EMA-cross strategy.
    Run {
        /// CSV file with timestamp,open,high,low,close,volume rows.
        #[arg(long)]
        data: PathBuf,

        /// Instrument symbol the file contains.
        #[arg(long, default_value = "DATA")]
        symbol: String,

        /// Path to a TOML config file (cash, commission, sizing, range).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Clip start date (YYYY-MM-DD), overrides the config range.
        #[arg(long)]
        from: Option<String>,

        /// Clip end date (YYYY-MM-DD, exclusive), overrides the config range.
        #[arg(long)]
        to: Option<String>,

        /// Starting cash, overrides the config.
        #[arg(long)]
        cash: Option<f64>,

        /// Order size, overrides the config.
        #[arg(long)]
        size: Option<f64>,

        /// Fast EMA period.
        #[arg(long, default_value_t = 10)]
        fast: usize,

        /// Slow EMA period.
        #[arg(long, default_value_t = 20)]
        slow: usize,

        /// Trailing-stop distance in price units (replaces the fixed stop).
        #[arg(long)]
        trail: Option<f64>,

        /// Fixed stop distance as a fraction of the entry close.
        #[arg(long, default_value_t = 0.02)]
        stop_loss: f64,

        /// Print the per-bar equity curve as TSV after the summary.
        #[arg(long, default_value_t = false)]
        print_equity: bool,
    },
}

// ── Config file ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
struct RunConfig {
    #[serde(default = "default_cash")]
    initial_cash: f64,
    #[serde(default = "default_size")]
    default_size: f64,
    #[serde(default)]
    commission: CommissionConfig,
    #[serde(default)]
    range: RangeConfig,
}

fn default_cash() -> f64 {
    100_000.0
}

fn default_size() -> f64 {
    100.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum CommissionConfig {
    Percent { rate: f64 },
    PerShare { amount: f64 },
    Flat { amount: f64 },
}

impl Default for CommissionConfig {
    fn default() -> Self {
        CommissionConfig::Percent { rate: 0.0 }
    }
}

impl From<&CommissionConfig> for CommissionSchema {
    fn from(config: &CommissionConfig) -> Self {
        match *config {
            CommissionConfig::Percent { rate } => CommissionSchema::Percent { rate },
            CommissionConfig::PerShare { amount } => CommissionSchema::PerShare { amount },
            CommissionConfig::Flat { amount } => CommissionSchema::Flat { amount },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RangeConfig {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        None => Ok(RunConfig::default()),
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
        }
    }
}

// ── CSV ingestion ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "date")]
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: u64,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .context("date has no midnight representation")?;
        return Ok(midnight.and_utc());
    }
    bail!("unparseable timestamp: {raw}")
}

fn load_bars(path: &Path, symbol: &str) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening data file {}", path.display()))?;
    let mut bars = Vec::new();
    for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.with_context(|| format!("row {index} of {}", path.display()))?;
        bars.push(Bar {
            symbol: symbol.to_string(),
            timestamp: parse_timestamp(&row.timestamp)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    if bars.is_empty() {
        bail!("no bars in {}", path.display());
    }
    Ok(bars)
}

fn date_bound(flag: Option<&str>, config: Option<NaiveDate>) -> Result<Option<DateTime<Utc>>> {
    let date = match flag {
        Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").context("bad date flag")?),
        None => config,
    };
    Ok(date.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc()))
}

// ── Reporting ────────────────────────────────────────────────────────

fn print_report(result: &RunResult, print_equity: bool) {
    let total_return = if result.initial_cash > 0.0 {
        100.0 * (result.final_equity - result.initial_cash) / result.initial_cash
    } else {
        0.0
    };
    let winners = result.trades.iter().filter(|t| t.is_winner()).count();

    println!("symbol          {}", result.symbol);
    println!("bars            {}", result.bars);
    println!("initial cash    {:.2}", result.initial_cash);
    println!("final equity    {:.2}", result.final_equity);
    println!("total return    {total_return:.2}%");
    println!("realized pnl    {:.2}", result.realized_pnl);
    println!("commission      {:.2}", result.total_commission);
    println!("trades          {} ({winners} winners)", result.trades.len());

    if !result.trades.is_empty() {
        println!();
        println!("trade  entry       exit        size      net pnl");
        for trade in &result.trades {
            println!(
                "{:<6} {:<11} {:<11} {:<9} {:.2}",
                trade.id,
                trade.entry_timestamp.format("%Y-%m-%d"),
                trade.exit_timestamp.format("%Y-%m-%d"),
                trade.size,
                trade.net_pnl,
            );
        }
    }

    if print_equity {
        println!();
        println!("bar\ttimestamp\tcash\tposition\tequity");
        for point in &result.equity_curve {
            println!(
                "{}\t{}\t{:.2}\t{:.2}\t{:.2}",
                point.bar_index,
                point.timestamp.format("%Y-%m-%d"),
                point.cash,
                point.position_value,
                point.equity,
            );
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            symbol,
            config,
            from,
            to,
            cash,
            size,
            fast,
            slow,
            trail,
            stop_loss,
            print_equity,
        } => {
            let config = load_config(config.as_deref())?;
            let initial_cash = cash.unwrap_or(config.initial_cash);
            let order_size = size.unwrap_or(config.default_size);
            let schema = CommissionSchema::from(&config.commission);

            let from = date_bound(from.as_deref(), config.range.from)?;
            let to = date_bound(to.as_deref(), config.range.to)?;

            let bars = load_bars(&data, &symbol)?;
            info!("loaded {} bars for {symbol}", bars.len());

            let feed = MemoryFeed::new(symbol.clone(), bars).with_range(from, to);
            let broker = Broker::new(symbol, Account::new(initial_cash, schema));

            let mut pipeline = Pipeline::new();
            let strategy = MaCross::new(
                &mut pipeline,
                MaCrossParams {
                    fast,
                    slow,
                    size: order_size,
                    stop_loss,
                    trail,
                },
            )?;

            let result = Scheduler::new(feed, pipeline, broker, strategy).run()?;
            print_report(&result, print_equity);
            Ok(())
        }
    }
}
