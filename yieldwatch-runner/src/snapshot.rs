//! Snapshot pipeline: current yield per ticker for one market.
//!
//! For every watchlist ticker: latest distribution, latest price, annualized
//! yield, and a valuation label against the ticker's historical stats. Rows
//! are sorted by yield (highest first) and the market's snapshot file is
//! replaced wholesale.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use yieldwatch_core::data::{DataError, DistributionSource, PriceSource};
use yieldwatch_core::domain::{Frequency, Market, Ticker};
use yieldwatch_core::series::HistoricalSeries;
use yieldwatch_core::stats::YieldStats;
use yieldwatch_core::yield_calc::annualized_yield;

use crate::config::MarketFiles;
use crate::error::RunError;
use crate::progress::RunProgress;
use crate::storage::{self, StorageError};
use crate::watchlist::load_watchlist;

/// Where the current yield sits relative to the ticker's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Valuation {
    /// Yield above median + one standard deviation.
    Underpriced,
    FairPrice,
    /// Yield below median minus one standard deviation.
    Overpriced,
    /// No stats, or a single observation.
    Unknown,
}

impl Valuation {
    pub fn classify(current_yield: f64, stats: Option<&YieldStats>) -> Self {
        let Some((median, sd)) = stats.and_then(|s| s.stddev_yield.map(|sd| (s.median_yield, sd)))
        else {
            return Valuation::Unknown;
        };
        if current_yield > median + sd {
            Valuation::Underpriced
        } else if current_yield < median - sd {
            Valuation::Overpriced
        } else {
            Valuation::FairPrice
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Valuation::Underpriced => "Underpriced",
            Valuation::FairPrice => "Fair Price",
            Valuation::Overpriced => "Overpriced",
            Valuation::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub updated_at: NaiveDate,
    pub ticker: String,
    pub price: f64,
    pub last_distribution: f64,
    pub last_ex_date: NaiveDate,
    pub frequency: Frequency,
    pub current_yield: f64,
    pub median_yield: Option<f64>,
    pub mean_yield: Option<f64>,
    pub stddev_yield: Option<f64>,
    pub valuation: Valuation,
}

/// Outcome of a snapshot build.
#[derive(Debug, Clone, Default)]
pub struct SnapshotReport {
    /// Sorted by yield descending, ticker ascending on ties.
    pub rows: Vec<SnapshotRow>,
    pub attempted: usize,
    /// `(ticker, reason)` for every ticker left out.
    pub skipped: Vec<(String, String)>,
    /// How many of the skipped tickers failed because a source was unreachable.
    pub outages: usize,
}

/// What a snapshot needs besides the tickers themselves.
pub struct SnapshotContext<'a> {
    pub prices: &'a dyn PriceSource,
    pub distributions: &'a dyn DistributionSource,
    /// Stored series, for the last recorded frequency of each ticker.
    pub history: &'a BTreeMap<String, HistoricalSeries>,
    pub stats: &'a BTreeMap<String, YieldStats>,
    pub today: NaiveDate,
}

fn snapshot_row(ctx: &SnapshotContext<'_>, ticker: &Ticker) -> Result<SnapshotRow, DataError> {
    let event = ctx.distributions.latest_distribution(ticker)?;
    let price = ctx.prices.latest_price(ticker)?;

    let frequency = ctx
        .history
        .get(&ticker.symbol)
        .and_then(HistoricalSeries::latest_frequency)
        .unwrap_or(event.frequency);
    let current_yield = annualized_yield(event.amount, frequency.per_year(), price.price)?;
    let stats = ctx.stats.get(&ticker.symbol);

    Ok(SnapshotRow {
        updated_at: ctx.today,
        ticker: ticker.symbol.clone(),
        price: price.price,
        last_distribution: event.amount,
        last_ex_date: event.ex_date,
        frequency,
        current_yield,
        median_yield: stats.map(|s| s.median_yield),
        mean_yield: stats.map(|s| s.mean_yield),
        stddev_yield: stats.and_then(|s| s.stddev_yield),
        valuation: Valuation::classify(current_yield, stats),
    })
}

/// Build snapshot rows for `tickers`. A ticker that fails is skipped and
/// never aborts the others.
pub fn build_snapshot(
    tickers: &[Ticker],
    ctx: &SnapshotContext<'_>,
    progress: &dyn RunProgress,
) -> SnapshotReport {
    let total = tickers.len();
    let mut report = SnapshotReport {
        attempted: total,
        ..Default::default()
    };

    for (i, ticker) in tickers.iter().enumerate() {
        progress.on_start(&ticker.symbol, i, total);
        match snapshot_row(ctx, ticker) {
            Ok(row) => {
                progress.on_complete(&ticker.symbol, i, total, Ok(()));
                report.rows.push(row);
            }
            Err(e) => {
                report.outages += usize::from(e.is_source_outage());
                let reason = e.to_string();
                progress.on_complete(&ticker.symbol, i, total, Err(&reason));
                report.skipped.push((ticker.symbol.clone(), reason));
            }
        }
    }

    report.rows.sort_by(|a, b| {
        b.current_yield
            .total_cmp(&a.current_yield)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    progress.on_batch_complete(report.rows.len(), report.skipped.len(), total);
    report
}

/// Run the snapshot for one market and replace its snapshot file.
///
/// When every ticker failed because a source was unreachable the existing
/// file is kept and [`RunError::TotalOutage`] is returned. Otherwise the file
/// is replaced, with only a header if no ticker had data.
pub fn run_snapshot(
    market: Market,
    files: &MarketFiles,
    prices: &dyn PriceSource,
    distributions: &dyn DistributionSource,
    today: NaiveDate,
    progress: &dyn RunProgress,
) -> Result<SnapshotReport, RunError> {
    let tickers = load_watchlist(&files.tickers, market).map_err(|source| StorageError::Io {
        path: files.tickers.clone(),
        source,
    })?;
    if tickers.is_empty() {
        info!(%market, "empty watchlist, snapshot not written");
        return Ok(SnapshotReport::default());
    }

    let history = storage::load_history(&files.history)?;
    let stats = storage::read_stats(&files.stats).unwrap_or_else(|e| {
        warn!(%market, error = %e, "stats unreadable, valuations unknown");
        BTreeMap::new()
    });
    let ctx = SnapshotContext {
        prices,
        distributions,
        history: &history,
        stats: &stats,
        today,
    };

    info!(%market, tickers = tickers.len(), "running snapshot");
    let report = build_snapshot(&tickers, &ctx, progress);
    if report.outages == report.attempted {
        return Err(RunError::TotalOutage {
            market,
            attempted: report.attempted,
        });
    }

    storage::write_snapshot(&files.snapshot, &report.rows)?;
    info!(
        %market,
        rows = report.rows.len(),
        skipped = report.skipped.len(),
        path = %files.snapshot.display(),
        "snapshot written"
    );
    Ok(report)
}
