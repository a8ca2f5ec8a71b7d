//! In-memory sources and fixture helpers shared by the pipeline tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use yieldwatch_core::data::{DataError, DistributionSource, PricePoint, PriceSource};
use yieldwatch_core::domain::{DataSource, DistributionEvent, Frequency, Ticker};
use yieldwatch_runner::MarketFiles;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Canned market data. Tickers not registered have no data.
#[derive(Default)]
pub struct MockMarket {
    events: HashMap<String, Vec<DistributionEvent>>,
    latest: HashMap<String, f64>,
    historical: HashMap<(String, NaiveDate), f64>,
    default_price: Option<f64>,
    missing_prices: HashSet<(String, NaiveDate)>,
    down: bool,
}

impl MockMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(
        mut self,
        symbol: &str,
        ex_date: NaiveDate,
        amount: f64,
        frequency: Frequency,
    ) -> Self {
        let events = self.events.entry(symbol.to_string()).or_default();
        events.push(DistributionEvent {
            ticker: symbol.to_string(),
            ex_date,
            amount,
            frequency,
            source: DataSource::YahooFinance,
        });
        events.sort_by_key(|e| e.ex_date);
        self
    }

    pub fn with_latest_price(mut self, symbol: &str, price: f64) -> Self {
        self.latest.insert(symbol.to_string(), price);
        self
    }

    pub fn with_price_on(mut self, symbol: &str, on: NaiveDate, price: f64) -> Self {
        self.historical.insert((symbol.to_string(), on), price);
        self
    }

    /// Price returned for any historical date without an explicit one.
    pub fn with_default_price(mut self, price: f64) -> Self {
        self.default_price = Some(price);
        self
    }

    pub fn without_price_on(mut self, symbol: &str, on: NaiveDate) -> Self {
        self.missing_prices.insert((symbol.to_string(), on));
        self
    }

    /// Every request fails as if the provider were unreachable.
    pub fn down(mut self) -> Self {
        self.down = true;
        self
    }

    fn outage(&self, ticker: &Ticker) -> Result<(), DataError> {
        if self.down {
            return Err(DataError::fetch_failure(&ticker.symbol, "connection refused"));
        }
        Ok(())
    }
}

impl PriceSource for MockMarket {
    fn name(&self) -> &str {
        "mock"
    }

    fn latest_price(&self, ticker: &Ticker) -> Result<PricePoint, DataError> {
        self.outage(ticker)?;
        self.latest
            .get(&ticker.symbol)
            .map(|&price| PricePoint {
                date: date(2024, 6, 28),
                price,
            })
            .ok_or_else(|| DataError::no_data(&ticker.symbol))
    }

    fn price_on(&self, ticker: &Ticker, on: NaiveDate) -> Result<PricePoint, DataError> {
        self.outage(ticker)?;
        let key = (ticker.symbol.clone(), on);
        let missing = || DataError::MissingPrice {
            symbol: ticker.symbol.clone(),
            date: on,
        };
        if self.missing_prices.contains(&key) {
            return Err(missing());
        }
        self.historical
            .get(&key)
            .copied()
            .or(self.default_price)
            .map(|price| PricePoint { date: on, price })
            .ok_or_else(missing)
    }
}

impl DistributionSource for MockMarket {
    fn name(&self) -> &str {
        "mock"
    }

    fn distribution_history(&self, ticker: &Ticker) -> Result<Vec<DistributionEvent>, DataError> {
        self.outage(ticker)?;
        match self.events.get(&ticker.symbol) {
            Some(events) if !events.is_empty() => Ok(events.clone()),
            _ => Err(DataError::no_data(&ticker.symbol)),
        }
    }
}

/// Market files inside `dir`, with the watchlist already written.
pub fn market_files(dir: &Path, tickers: &[&str]) -> MarketFiles {
    let files = MarketFiles {
        tickers: dir.join("tickers.txt"),
        snapshot: dir.join("snapshot.csv"),
        history: dir.join("history.csv"),
        stats: dir.join("stats.csv"),
    };
    let mut list = String::from("# test watchlist\n");
    for t in tickers {
        list.push_str(t);
        list.push('\n');
    }
    std::fs::write(&files.tickers, list).unwrap();
    files
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
