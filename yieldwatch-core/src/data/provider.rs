//! Source traits and structured error types.
//!
//! `PriceSource` and `DistributionSource` abstract over where prices and
//! distributions come from (Yahoo Finance, a CSV import, a cache in front of
//! either) so the pipelines never depend on a concrete provider and tests can
//! substitute in-memory mocks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DistributionEvent, Ticker};

pub use crate::domain::DataSource;

/// Structured error types for data operations.
///
/// The first four are the kinds every pipeline reasons about; the rest are
/// provider detail that the pipelines treat like `FetchFailure`.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("fetch failed for {symbol}: {reason}")]
    FetchFailure { symbol: String, reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("no price for {symbol} on {date}")]
    MissingPrice { symbol: String, date: NaiveDate },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,
}

impl DataError {
    pub fn no_data(symbol: impl Into<String>) -> Self {
        DataError::NoData {
            symbol: symbol.into(),
        }
    }

    pub fn fetch_failure(symbol: impl Into<String>, reason: impl ToString) -> Self {
        DataError::FetchFailure {
            symbol: symbol.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that say the source itself is unreachable,
    /// as opposed to having nothing for this ticker.
    pub fn is_source_outage(&self) -> bool {
        matches!(
            self,
            DataError::FetchFailure { .. }
                | DataError::RateLimited { .. }
                | DataError::CircuitBreakerTripped
        )
    }
}

/// A price observation.
///
/// `date` is the trading day the price belongs to, which may differ from the
/// requested date when the source falls back to the nearest session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Trait for price providers.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Most recent available price.
    fn latest_price(&self, ticker: &Ticker) -> Result<PricePoint, DataError>;

    /// Closing price on `date`, or the nearest session to it.
    ///
    /// Fails with `MissingPrice` when nothing is available around that date.
    fn price_on(&self, ticker: &Ticker, date: NaiveDate) -> Result<PricePoint, DataError>;
}

/// Trait for distribution providers.
pub trait DistributionSource: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Every known distribution, ordered by ex-date ascending.
    ///
    /// A ticker that has never paid is `NoData`, never an empty `Ok`.
    fn distribution_history(&self, ticker: &Ticker) -> Result<Vec<DistributionEvent>, DataError>;

    /// The most recent distribution.
    fn latest_distribution(&self, ticker: &Ticker) -> Result<DistributionEvent, DataError> {
        self.distribution_history(ticker)?
            .into_iter()
            .max_by_key(|e| e.ex_date)
            .ok_or_else(|| DataError::no_data(&ticker.symbol))
    }
}

impl<T: PriceSource + ?Sized> PriceSource for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn latest_price(&self, ticker: &Ticker) -> Result<PricePoint, DataError> {
        (**self).latest_price(ticker)
    }

    fn price_on(&self, ticker: &Ticker, date: NaiveDate) -> Result<PricePoint, DataError> {
        (**self).price_on(ticker, date)
    }
}

impl<T: DistributionSource + ?Sized> DistributionSource for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn distribution_history(&self, ticker: &Ticker) -> Result<Vec<DistributionEvent>, DataError> {
        (**self).distribution_history(ticker)
    }

    fn latest_distribution(&self, ticker: &Ticker) -> Result<DistributionEvent, DataError> {
        (**self).latest_distribution(ticker)
    }
}
