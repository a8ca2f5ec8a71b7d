//! CSV import distribution source.
//!
//! Reads distribution history from a local file with the columns
//! `Ticker,Ex-Div Date,Dividend[,Frequency]`. Amounts may carry `$` and
//! thousands separators. Rows without a usable frequency get one inferred
//! from the ticker's ex-date spacing.

use super::provider::{DataError, DistributionSource};
use crate::domain::{DataSource, DistributionEvent, Frequency, Ticker};
use crate::inference::infer_frequencies;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

#[derive(Debug, Deserialize)]
struct ImportRow {
    #[serde(rename = "Ticker")]
    ticker: String,
    #[serde(rename = "Ex-Div Date")]
    ex_date: String,
    #[serde(rename = "Dividend")]
    dividend: String,
    #[serde(rename = "Frequency", default)]
    frequency: Option<String>,
}

pub struct CsvDistributionSource {
    by_symbol: BTreeMap<String, Vec<DistributionEvent>>,
}

impl CsvDistributionSource {
    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let file = std::fs::File::open(path).map_err(|e| {
            DataError::fetch_failure(path.display().to_string(), e)
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut grouped: BTreeMap<String, Vec<(NaiveDate, f64, Option<Frequency>)>> =
            BTreeMap::new();

        for (i, row) in rdr.deserialize::<ImportRow>().enumerate() {
            let line = i + 2;
            let row = row.map_err(|e| DataError::InvalidInput(format!("line {line}: {e}")))?;
            let ex_date = parse_date(&row.ex_date).ok_or_else(|| {
                DataError::InvalidInput(format!("line {line}: bad ex-date '{}'", row.ex_date))
            })?;
            let amount = parse_amount(&row.dividend).ok_or_else(|| {
                DataError::InvalidInput(format!("line {line}: bad dividend '{}'", row.dividend))
            })?;
            let frequency = row.frequency.as_deref().and_then(Frequency::parse);
            grouped
                .entry(row.ticker.to_ascii_uppercase())
                .or_default()
                .push((ex_date, amount, frequency));
        }

        let by_symbol = grouped
            .into_iter()
            .map(|(symbol, mut rows)| {
                rows.sort_by_key(|(date, _, _)| *date);
                rows.dedup_by_key(|(date, _, _)| *date);
                let pairs: Vec<(NaiveDate, f64)> = rows.iter().map(|(d, a, _)| (*d, *a)).collect();
                let inferred = infer_frequencies(&pairs);
                let events = rows
                    .into_iter()
                    .zip(inferred)
                    .map(|((ex_date, amount, given), guess)| DistributionEvent {
                        ticker: symbol.clone(),
                        ex_date,
                        amount,
                        frequency: given.unwrap_or(guess),
                        source: DataSource::CsvImport,
                    })
                    .collect();
                (symbol, events)
            })
            .collect();

        Ok(Self { by_symbol })
    }

    pub fn symbol_count(&self) -> usize {
        self.by_symbol.len()
    }

    fn lookup(&self, ticker: &Ticker) -> Option<&Vec<DistributionEvent>> {
        self.by_symbol
            .get(&ticker.symbol.to_ascii_uppercase())
            .or_else(|| self.by_symbol.get(&ticker.provider_symbol().to_ascii_uppercase()))
    }
}

impl DistributionSource for CsvDistributionSource {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn distribution_history(&self, ticker: &Ticker) -> Result<Vec<DistributionEvent>, DataError> {
        let events = self
            .lookup(ticker)
            .filter(|events| !events.is_empty())
            .ok_or_else(|| DataError::no_data(&ticker.symbol))?;
        // Events are keyed by the watchlist spelling, whatever the file used.
        Ok(events
            .iter()
            .cloned()
            .map(|mut e| {
                e.ticker = ticker.symbol.clone();
                e
            })
            .collect())
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text.trim(), fmt).ok())
}

fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
