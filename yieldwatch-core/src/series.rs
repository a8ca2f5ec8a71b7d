//! Per-ticker historical yield series.
//!
//! The series is ordered by date and holds at most one record per date.
//! Records are only ever added: an insert for a date that is already present
//! is refused and the stored record is left untouched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DistributionEvent, Frequency, YieldRecord};

/// Outcome of [`HistoricalSeries::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    Inserted,
    /// A record for this date already exists; nothing changed.
    Duplicate,
    /// The record belongs to another ticker; nothing changed.
    WrongTicker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    ticker: String,
    records: Vec<YieldRecord>,
}

impl HistoricalSeries {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            records: Vec::new(),
        }
    }

    /// Build a series from stored records.
    ///
    /// Records for other tickers are ignored; for a repeated date the first
    /// record wins.
    pub fn from_records(ticker: impl Into<String>, records: Vec<YieldRecord>) -> Self {
        let mut series = Self::new(ticker);
        for record in records {
            series.insert(record);
        }
        series
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn records(&self) -> &[YieldRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.position(date).is_ok()
    }

    pub fn latest(&self) -> Option<&YieldRecord> {
        self.records.last()
    }

    /// Frequency of the most recent record.
    pub fn latest_frequency(&self) -> Option<Frequency> {
        self.latest().map(|r| r.frequency)
    }

    /// Annualized yields in date order.
    pub fn yields(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.annualized_yield).collect()
    }

    /// Insert a record at its date position.
    pub fn insert(&mut self, record: YieldRecord) -> InsertResult {
        if record.ticker != self.ticker {
            return InsertResult::WrongTicker;
        }
        match self.position(record.date) {
            Ok(_) => InsertResult::Duplicate,
            Err(idx) => {
                self.records.insert(idx, record);
                InsertResult::Inserted
            }
        }
    }

    /// Events for this ticker whose ex-date is not yet in the series,
    /// in ex-date order with repeated dates collapsed to their first occurrence.
    pub fn pending<'a>(&self, events: &'a [DistributionEvent]) -> Vec<&'a DistributionEvent> {
        let mut pending: Vec<&DistributionEvent> = events
            .iter()
            .filter(|e| e.ticker == self.ticker && !self.contains(e.ex_date))
            .collect();
        pending.sort_by_key(|e| e.ex_date);
        pending.dedup_by_key(|e| e.ex_date);
        pending
    }

    fn position(&self, date: NaiveDate) -> Result<usize, usize> {
        self.records.binary_search_by_key(&date, |r| r.date)
    }
}
