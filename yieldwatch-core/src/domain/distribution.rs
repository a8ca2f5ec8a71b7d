//! Distribution events and the yield records derived from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::frequency::Frequency;
use crate::data::provider::DataError;
use crate::yield_calc::{annualized_yield, round_to, DISPLAY_PLACES};

/// Where a distribution (and the records derived from it) came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    /// Rows scraped from dividendhistory.org by earlier tooling.
    #[serde(rename = "dividendhistory.org")]
    DividendHistory,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::YahooFinance => "yahoo_finance",
            DataSource::CsvImport => "csv_import",
            DataSource::DividendHistory => "dividendhistory.org",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "yahoo_finance" | "yfinance" => Ok(DataSource::YahooFinance),
            "csv_import" => Ok(DataSource::CsvImport),
            "dividendhistory.org" | "dividendhistory" => Ok(DataSource::DividendHistory),
            other => Err(format!("unknown data source '{other}'")),
        }
    }
}

/// A single cash distribution, keyed by `(ticker, ex_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionEvent {
    pub ticker: String,
    pub ex_date: NaiveDate,
    pub amount: f64,
    pub frequency: Frequency,
    pub source: DataSource,
}

/// Annualized yield of one distribution at the price observed on its date.
///
/// Only ever built through [`YieldRecord::from_event`] (or read back from a
/// history file that was written from one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldRecord {
    pub ticker: String,
    pub date: NaiveDate,
    pub price: f64,
    pub amount: f64,
    pub frequency: Frequency,
    pub annualized_yield: f64,
    pub source: DataSource,
}

impl YieldRecord {
    /// Price the event and compute its annualized yield (full precision).
    pub fn from_event(event: &DistributionEvent, price: f64) -> Result<Self, DataError> {
        let annualized_yield = annualized_yield(event.amount, event.frequency.per_year(), price)?;
        Ok(Self {
            ticker: event.ticker.clone(),
            date: event.ex_date,
            price,
            amount: event.amount,
            frequency: event.frequency,
            annualized_yield,
            source: event.source,
        })
    }

    /// The record as a history file holds it: price and yield rounded to
    /// [`DISPLAY_PLACES`]. Series that are persisted keep only stored records,
    /// so stats over a reloaded file match stats over the in-memory series.
    pub fn stored(self) -> Self {
        Self {
            price: round_to(self.price, DISPLAY_PLACES),
            annualized_yield: round_to(self.annualized_yield, DISPLAY_PLACES),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(amount: f64, frequency: Frequency) -> DistributionEvent {
        DistributionEvent {
            ticker: "JEPI".into(),
            ex_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            amount,
            frequency,
            source: DataSource::YahooFinance,
        }
    }

    #[test]
    fn record_carries_event_fields() {
        let rec = YieldRecord::from_event(&event(0.5, Frequency::Monthly), 60.0).unwrap();
        assert_eq!(rec.ticker, "JEPI");
        assert_eq!(rec.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(rec.frequency, Frequency::Monthly);
        assert!((rec.annualized_yield - 10.0).abs() < 1e-12);
    }

    #[test]
    fn record_rejects_zero_price() {
        let err = YieldRecord::from_event(&event(0.5, Frequency::Monthly), 0.0).unwrap_err();
        assert!(matches!(err, DataError::InvalidInput(_)));
    }

    #[test]
    fn stored_record_rounds_price_and_yield() {
        let rec = YieldRecord::from_event(&event(0.1, Frequency::Monthly), 100.0004)
            .unwrap()
            .stored();
        assert_eq!(rec.price, 100.0);
        assert_eq!(rec.annualized_yield, 1.2);
        assert_eq!(rec.amount, 0.1);
    }

    #[test]
    fn data_source_parses_aliases() {
        assert_eq!("yfinance".parse::<DataSource>().unwrap(), DataSource::YahooFinance);
        assert_eq!("csv_import".parse::<DataSource>().unwrap(), DataSource::CsvImport);
        assert_eq!(
            "dividendhistory.org".parse::<DataSource>().unwrap(),
            DataSource::DividendHistory
        );
        assert_eq!(DataSource::DividendHistory.to_string(), "dividendhistory.org");
        assert!("bloomberg".parse::<DataSource>().is_err());
    }
}
