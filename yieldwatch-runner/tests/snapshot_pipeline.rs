//! Integration tests for the snapshot pipeline against in-memory sources.

mod common;

use common::{date, market_files, read_lines, MockMarket};
use yieldwatch_core::domain::{Frequency, Market};
use yieldwatch_runner::{run_snapshot, RunError, SilentProgress, Valuation};

fn two_ticker_market() -> MockMarket {
    MockMarket::new()
        .with_event("AAA", date(2024, 6, 3), 1.0, Frequency::Monthly)
        .with_latest_price("AAA", 100.0)
        .with_event("BBB", date(2024, 6, 10), 2.0, Frequency::Quarterly)
        .with_latest_price("BBB", 50.0)
}

#[test]
fn rows_sorted_by_yield_descending() {
    let dir = tempfile::tempdir().unwrap();
    let files = market_files(dir.path(), &["AAA", "BBB"]);
    let market = two_ticker_market();

    let report = run_snapshot(Market::Us, &files, &market, &market, date(2024, 6, 30), &SilentProgress)
        .unwrap();

    let tickers: Vec<_> = report.rows.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, ["BBB", "AAA"]);
    assert!((report.rows[0].current_yield - 16.0).abs() < 1e-9);
    assert!((report.rows[1].current_yield - 12.0).abs() < 1e-9);

    let lines = read_lines(&files.snapshot);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Updated,Ticker,Price"));
    assert_eq!(lines[1], "2024-06-30,BBB,50.000,2,2024-06-10,Quarterly,16.000,,,,Unknown");
}

#[test]
fn ticker_without_distributions_is_left_out() {
    let dir = tempfile::tempdir().unwrap();
    let files = market_files(dir.path(), &["AAA", "NODIV", "BBB"]);
    let market = two_ticker_market().with_latest_price("NODIV", 20.0);

    let report = run_snapshot(Market::Us, &files, &market, &market, date(2024, 6, 30), &SilentProgress)
        .unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "NODIV");
    let text = std::fs::read_to_string(&files.snapshot).unwrap();
    assert!(!text.contains("NODIV"));
}

#[test]
fn equal_yields_break_ties_by_ticker() {
    let dir = tempfile::tempdir().unwrap();
    let files = market_files(dir.path(), &["ZZZ", "MMM"]);
    let market = MockMarket::new()
        .with_event("ZZZ", date(2024, 6, 3), 0.5, Frequency::Monthly)
        .with_latest_price("ZZZ", 60.0)
        .with_event("MMM", date(2024, 6, 3), 0.5, Frequency::Monthly)
        .with_latest_price("MMM", 60.0);

    let report = run_snapshot(Market::Us, &files, &market, &market, date(2024, 6, 30), &SilentProgress)
        .unwrap();
    let tickers: Vec<_> = report.rows.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, ["MMM", "ZZZ"]);
}

#[test]
fn recorded_frequency_overrides_source() {
    let dir = tempfile::tempdir().unwrap();
    let files = market_files(dir.path(), &["AAA"]);
    std::fs::write(
        &files.history,
        "Ticker,Ex-Div Date,Dividend,Price on Ex-Date,Annualized Yield %,Frequency,Source\n\
         AAA,2024-03-01,1.0,100.000,4.000,Quarterly,yahoo_finance\n",
    )
    .unwrap();
    let market = two_ticker_market();

    let report = run_snapshot(Market::Us, &files, &market, &market, date(2024, 6, 30), &SilentProgress)
        .unwrap();
    assert_eq!(report.rows[0].frequency, Frequency::Quarterly);
    assert!((report.rows[0].current_yield - 4.0).abs() < 1e-9);
}

#[test]
fn valuation_uses_stored_stats() {
    let dir = tempfile::tempdir().unwrap();
    let files = market_files(dir.path(), &["AAA", "BBB"]);
    std::fs::write(
        &files.stats,
        "Ticker,Mean Yield %,Median Yield %,Std Dev %,Samples\n\
         AAA,10.000,10.000,1.000,24\n\
         BBB,16.500,16.500,,1\n",
    )
    .unwrap();
    let market = two_ticker_market();

    let report = run_snapshot(Market::Us, &files, &market, &market, date(2024, 6, 30), &SilentProgress)
        .unwrap();
    let aaa = report.rows.iter().find(|r| r.ticker == "AAA").unwrap();
    assert_eq!(aaa.valuation, Valuation::Underpriced);
    assert_eq!(aaa.median_yield, Some(10.0));
    let bbb = report.rows.iter().find(|r| r.ticker == "BBB").unwrap();
    assert_eq!(bbb.valuation, Valuation::Unknown);
    assert_eq!(bbb.stddev_yield, None);
}

#[test]
fn snapshot_replaces_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let files = market_files(dir.path(), &["AAA"]);
    std::fs::write(&files.snapshot, "stale,content\nOLD,1\n").unwrap();
    let market = two_ticker_market();

    run_snapshot(Market::Us, &files, &market, &market, date(2024, 6, 30), &SilentProgress).unwrap();
    let text = std::fs::read_to_string(&files.snapshot).unwrap();
    assert!(!text.contains("OLD"));
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn total_outage_keeps_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let files = market_files(dir.path(), &["AAA", "BBB"]);
    std::fs::write(&files.snapshot, "previous run\n").unwrap();
    let market = two_ticker_market().down();

    let err = run_snapshot(Market::Us, &files, &market, &market, date(2024, 6, 30), &SilentProgress)
        .unwrap_err();
    assert!(matches!(err, RunError::TotalOutage { attempted: 2, .. }));
    assert_eq!(std::fs::read_to_string(&files.snapshot).unwrap(), "previous run\n");
}

#[test]
fn empty_watchlist_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let files = market_files(dir.path(), &[]);
    let market = two_ticker_market();

    let report = run_snapshot(Market::Us, &files, &market, &market, date(2024, 6, 30), &SilentProgress)
        .unwrap();
    assert!(report.rows.is_empty());
    assert!(!files.snapshot.exists());
}

#[test]
fn non_paying_watchlist_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let files = market_files(dir.path(), &["NODIV"]);
    std::fs::write(&files.snapshot, "Updated,Ticker\n2024-01-01,OLDROW\n").unwrap();
    let market = MockMarket::new().with_latest_price("NODIV", 20.0);

    let report = run_snapshot(Market::Us, &files, &market, &market, date(2024, 6, 30), &SilentProgress)
        .unwrap();
    assert!(report.rows.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.outages, 0);

    let lines = read_lines(&files.snapshot);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Updated,Ticker,Price"));
}

#[test]
fn stats_without_median_give_unknown_valuation() {
    let dir = tempfile::tempdir().unwrap();
    let files = market_files(dir.path(), &["AAA"]);
    std::fs::write(&files.stats, "Ticker,Mean Yield %,Std Dev %\nAAA,12.0,0.5\n").unwrap();
    let market = two_ticker_market();

    let report = run_snapshot(Market::Us, &files, &market, &market, date(2024, 6, 30), &SilentProgress)
        .unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].valuation, Valuation::Unknown);
    assert_eq!(report.rows[0].mean_yield, None);
}
