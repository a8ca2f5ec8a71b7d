//! History pipeline: append-only yield history and derived stats.
//!
//! For every watchlist ticker the full distribution history is fetched and
//! each ex-date the history file does not have yet is priced and recorded.
//! Only the new rows are appended; rows already in the file are never
//! rewritten. Stats are then rebuilt from the whole merged history.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use yieldwatch_core::data::{DataError, DistributionSource, PriceSource};
use yieldwatch_core::domain::{DistributionEvent, Market, Ticker, YieldRecord};
use yieldwatch_core::series::{HistoricalSeries, InsertResult};
use yieldwatch_core::stats::{compute_all, YieldStats};

use crate::config::MarketFiles;
use crate::error::RunError;
use crate::progress::RunProgress;
use crate::storage::{self, StorageError};
use crate::watchlist::load_watchlist;

/// Result of merging one ticker's events into its series.
#[derive(Debug, Default)]
pub struct TickerUpdate {
    /// Records added, in date order.
    pub added: Vec<YieldRecord>,
    /// Events left out because no price or yield could be had for them.
    pub skipped_events: usize,
    /// Set when the price source went away mid-ticker; remaining events
    /// are left for the next run.
    pub aborted: Option<DataError>,
}

/// Price and record every event `series` does not have yet.
///
/// `MissingPrice` (or an unusable price) skips only that event. A source
/// outage stops the ticker, keeping whatever was already added.
pub fn update_series(
    series: &mut HistoricalSeries,
    ticker: &Ticker,
    events: &[DistributionEvent],
    prices: &dyn PriceSource,
) -> TickerUpdate {
    let mut update = TickerUpdate::default();

    for event in series.pending(events) {
        let point = match prices.price_on(ticker, event.ex_date) {
            Ok(point) => point,
            Err(e) if e.is_source_outage() => {
                update.aborted = Some(e);
                break;
            }
            Err(e) => {
                warn!(ticker = %ticker, ex_date = %event.ex_date, error = %e, "event skipped");
                update.skipped_events += 1;
                continue;
            }
        };

        let record = match YieldRecord::from_event(event, point.price) {
            Ok(record) => record.stored(),
            Err(e) => {
                warn!(ticker = %ticker, ex_date = %event.ex_date, error = %e, "event skipped");
                update.skipped_events += 1;
                continue;
            }
        };

        if series.insert(record.clone()) == InsertResult::Inserted {
            debug!(ticker = %ticker, ex_date = %record.date, yield_pct = record.annualized_yield, "recorded");
            update.added.push(record);
        }
    }

    update
}

/// Outcome of a history run for one market.
#[derive(Debug, Clone, Default)]
pub struct HistoryReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub rows_appended: usize,
    pub skipped_events: usize,
    /// `(ticker, reason)` for every ticker that failed.
    pub failed: Vec<(String, String)>,
    /// The stats written, highest mean first.
    pub stats: Vec<YieldStats>,
}

/// Run the history update for one market: append new rows to the history
/// file and replace the stats file.
///
/// When every ticker failed because a source was unreachable nothing is
/// written and [`RunError::TotalOutage`] is returned. Tickers that simply
/// have no data never fail the run.
pub fn run_history(
    market: Market,
    files: &MarketFiles,
    prices: &dyn PriceSource,
    distributions: &dyn DistributionSource,
    progress: &dyn RunProgress,
) -> Result<HistoryReport, RunError> {
    let tickers = load_watchlist(&files.tickers, market).map_err(|source| StorageError::Io {
        path: files.tickers.clone(),
        source,
    })?;
    if tickers.is_empty() {
        info!(%market, "empty watchlist, history not updated");
        return Ok(HistoryReport::default());
    }

    let mut history: BTreeMap<String, HistoricalSeries> = storage::load_history(&files.history)?;
    let total = tickers.len();
    let mut report = HistoryReport {
        attempted: total,
        ..Default::default()
    };
    let mut new_rows: Vec<YieldRecord> = Vec::new();
    let mut outages = 0usize;

    info!(%market, tickers = total, "running history update");
    for (i, ticker) in tickers.iter().enumerate() {
        progress.on_start(&ticker.symbol, i, total);

        let events = match distributions.distribution_history(ticker) {
            Ok(events) => events,
            Err(e) => {
                outages += usize::from(e.is_source_outage());
                let reason = e.to_string();
                progress.on_complete(&ticker.symbol, i, total, Err(&reason));
                report.failed.push((ticker.symbol.clone(), reason));
                continue;
            }
        };

        let series = history
            .entry(ticker.symbol.clone())
            .or_insert_with(|| HistoricalSeries::new(ticker.symbol.clone()));
        let update = update_series(series, ticker, &events, prices);
        report.skipped_events += update.skipped_events;

        match update.aborted {
            Some(e) if update.added.is_empty() => {
                outages += 1;
                let reason = e.to_string();
                progress.on_complete(&ticker.symbol, i, total, Err(&reason));
                report.failed.push((ticker.symbol.clone(), reason));
            }
            aborted => {
                if let Some(e) = aborted {
                    warn!(ticker = %ticker, error = %e, added = update.added.len(), "price source failed, remaining events deferred");
                }
                progress.on_complete(&ticker.symbol, i, total, Ok(()));
                report.succeeded += 1;
            }
        }
        new_rows.extend(update.added);
    }
    progress.on_batch_complete(report.succeeded, report.failed.len(), total);

    if outages == total {
        return Err(RunError::TotalOutage {
            market,
            attempted: total,
        });
    }

    report.rows_appended = storage::append_history(&files.history, &new_rows)?;
    report.stats = compute_all(history.values());
    storage::write_stats(&files.stats, &report.stats)?;

    info!(
        %market,
        appended = report.rows_appended,
        skipped_events = report.skipped_events,
        failed = report.failed.len(),
        stats_rows = report.stats.len(),
        "history updated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};
    use yieldwatch_core::data::PricePoint;
    use yieldwatch_core::domain::{DataSource, Frequency};

    struct StepPrices {
        /// Day of month that has no price.
        missing_day: u32,
        /// Day of month from which the source is down.
        down_from: u32,
    }

    impl PriceSource for StepPrices {
        fn name(&self) -> &str {
            "step"
        }

        fn latest_price(&self, ticker: &Ticker) -> Result<PricePoint, DataError> {
            Err(DataError::no_data(&ticker.symbol))
        }

        fn price_on(&self, ticker: &Ticker, date: NaiveDate) -> Result<PricePoint, DataError> {
            let day = date.day();
            if day >= self.down_from {
                return Err(DataError::fetch_failure(&ticker.symbol, "timeout"));
            }
            if day == self.missing_day {
                return Err(DataError::MissingPrice {
                    symbol: ticker.symbol.clone(),
                    date,
                });
            }
            Ok(PricePoint { date, price: 10.0 })
        }
    }

    fn event(day: u32) -> DistributionEvent {
        DistributionEvent {
            ticker: "ZWC".into(),
            ex_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            amount: 0.1,
            frequency: Frequency::Monthly,
            source: DataSource::YahooFinance,
        }
    }

    #[test]
    fn missing_price_skips_only_that_event() {
        let ticker = Ticker::new("ZWC", Market::Canada);
        let mut series = HistoricalSeries::new("ZWC");
        let prices = StepPrices {
            missing_day: 2,
            down_from: 31,
        };
        let update = update_series(&mut series, &ticker, &[event(1), event(2), event(3)], &prices);
        assert_eq!(update.added.len(), 2);
        assert_eq!(update.skipped_events, 1);
        assert!(update.aborted.is_none());
        assert!(!series.contains(event(2).ex_date));
        assert!((update.added[0].annualized_yield - 12.0).abs() < 1e-9);
    }

    #[test]
    fn outage_stops_ticker_but_keeps_earlier_records() {
        let ticker = Ticker::new("ZWC", Market::Canada);
        let mut series = HistoricalSeries::new("ZWC");
        let prices = StepPrices {
            missing_day: 0,
            down_from: 3,
        };
        let update = update_series(&mut series, &ticker, &[event(1), event(2), event(3), event(4)], &prices);
        assert_eq!(update.added.len(), 2);
        assert!(update.aborted.is_some());
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn known_dates_are_not_repriced() {
        let ticker = Ticker::new("ZWC", Market::Canada);
        let mut series = HistoricalSeries::new("ZWC");
        let prices = StepPrices {
            missing_day: 0,
            down_from: 31,
        };
        update_series(&mut series, &ticker, &[event(1)], &prices);

        // Source down for every date: only the unseen date is attempted.
        let down = StepPrices {
            missing_day: 0,
            down_from: 1,
        };
        let update = update_series(&mut series, &ticker, &[event(1)], &down);
        assert!(update.added.is_empty());
        assert!(update.aborted.is_none());
    }
}
