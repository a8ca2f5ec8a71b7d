//! Yieldwatch CLI: snapshot, history, and config commands.
//!
//! Commands:
//! - `snapshot`: current yield per watchlist ticker, one CSV per market
//! - `history`: append new distributions to the yield history and rebuild stats
//! - `init-config`: write the default `yieldwatch.toml`

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yieldwatch_core::data::{
    ChainedDistributionSource, CircuitBreaker, CsvDistributionSource, DistributionSource,
    YahooProvider,
};
use yieldwatch_core::domain::Market;
use yieldwatch_runner::{
    run_history, run_snapshot, CachedPriceSource, LogProgress, PriceCache, RunError,
    TrackerConfig, DEFAULT_CONFIG_FILE,
};

#[derive(Parser)]
#[command(
    name = "yieldwatch",
    version,
    about = "Yieldwatch: ETF distribution yield tracker"
)]
struct Cli {
    /// Path to the TOML config file. Relative paths inside it resolve against its directory.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Only run this market (canada or us). Defaults to both.
    #[arg(long, global = true)]
    market: Option<Market>,

    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    /// Read distributions from this CSV first, falling back to Yahoo Finance.
    #[arg(long, global = true)]
    offline_dividends: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the current-yield snapshot for each market.
    Snapshot,
    /// Append new distributions to each market's history and rebuild its stats.
    History,
    /// Write the default config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::InitConfig { force } => run_init_config(&cli.config, force),
        Commands::Snapshot => {
            let ctx = RunContext::new(&cli)?;
            exit_on_outage(ctx.snapshot())
        }
        Commands::History => {
            let ctx = RunContext::new(&cli)?;
            exit_on_outage(ctx.history())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

/// Exit non-zero when a market had nothing but failures.
fn exit_on_outage(outages: Result<Vec<Market>>) -> Result<()> {
    let outages = outages?;
    if !outages.is_empty() {
        let names: Vec<&str> = outages.iter().map(Market::as_str).collect();
        eprintln!("Total outage for: {}", names.join(", "));
        std::process::exit(1);
    }
    Ok(())
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let toml = TrackerConfig::default().to_toml()?;
    std::fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

/// Everything a snapshot or history command needs, built once.
struct RunContext {
    config: TrackerConfig,
    markets: Vec<Market>,
    yahoo: YahooProvider,
    csv: Option<CsvDistributionSource>,
}

impl RunContext {
    fn new(cli: &Cli) -> Result<Self> {
        let base = cli.config.parent().unwrap_or_else(|| Path::new(""));
        let config = TrackerConfig::load_or_default(&cli.config)
            .with_context(|| format!("load config {}", cli.config.display()))?
            .rebased(base);

        let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
        let yahoo = YahooProvider::new(
            circuit_breaker,
            config.http.timeout(),
            config.http.max_retries,
        )?;

        let csv = cli
            .offline_dividends
            .as_deref()
            .map(|path| {
                CsvDistributionSource::from_path(path)
                    .with_context(|| format!("load distributions from {}", path.display()))
            })
            .transpose()?;
        if let Some(csv) = &csv {
            tracing::info!(symbols = csv.symbol_count(), "using CSV distributions ahead of Yahoo Finance");
        }

        let markets = match cli.market {
            Some(market) => vec![market],
            None => Market::ALL.to_vec(),
        };

        Ok(Self {
            config,
            markets,
            yahoo,
            csv,
        })
    }

    fn distributions(&self) -> ChainedDistributionSource<'_> {
        let mut sources: Vec<&dyn DistributionSource> = Vec::new();
        if let Some(csv) = &self.csv {
            sources.push(csv);
        }
        sources.push(&self.yahoo);
        ChainedDistributionSource::new(sources)
    }

    /// Runs every market; returns the markets that suffered a total outage.
    fn snapshot(&self) -> Result<Vec<Market>> {
        let today = chrono::Local::now().date_naive();
        let distributions = self.distributions();
        let mut outages = Vec::new();

        for &market in &self.markets {
            let files = self.config.files(market);
            match run_snapshot(market, files, &self.yahoo, &distributions, today, &LogProgress) {
                Ok(report) => {
                    println!(
                        "{market}: {} of {} tickers written to {}",
                        report.rows.len(),
                        report.attempted,
                        files.snapshot.display()
                    );
                    for (ticker, reason) in &report.skipped {
                        println!("  skipped {ticker}: {reason}");
                    }
                }
                Err(RunError::TotalOutage { .. }) => outages.push(market),
                Err(e) => return Err(e).with_context(|| format!("{market} snapshot")),
            }
        }
        Ok(outages)
    }

    fn history(&self) -> Result<Vec<Market>> {
        let cache = PriceCache::load(&self.config.price_cache)?;
        let prices = CachedPriceSource::new(&self.yahoo, &cache);
        let distributions = self.distributions();
        let mut outages = Vec::new();

        for &market in &self.markets {
            let files = self.config.files(market);
            let result = run_history(market, files, &prices, &distributions, &LogProgress);
            match result {
                Ok(report) => {
                    println!(
                        "{market}: {} new rows in {}, stats for {} tickers in {}",
                        report.rows_appended,
                        files.history.display(),
                        report.stats.len(),
                        files.stats.display()
                    );
                    for (ticker, reason) in &report.failed {
                        println!("  failed {ticker}: {reason}");
                    }
                }
                Err(RunError::TotalOutage { .. }) => outages.push(market),
                Err(e) => {
                    cache.save()?;
                    return Err(e).with_context(|| format!("{market} history"));
                }
            }
        }

        cache.save()?;
        Ok(outages)
    }
}
