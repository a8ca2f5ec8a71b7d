//! Primary/fallback chaining of distribution sources.

use super::provider::{DataError, DistributionSource};
use crate::domain::{DistributionEvent, Ticker};
use tracing::debug;

/// Tries each source in order; the first non-empty history wins.
///
/// When every source fails, the error of the last one is returned, unless an
/// earlier source reported an outage while later ones only had no data; then
/// the outage is returned so the caller does not mistake it for "never paid".
pub struct ChainedDistributionSource<'a> {
    sources: Vec<&'a dyn DistributionSource>,
}

impl<'a> ChainedDistributionSource<'a> {
    pub fn new(sources: Vec<&'a dyn DistributionSource>) -> Self {
        Self { sources }
    }
}

impl DistributionSource for ChainedDistributionSource<'_> {
    fn name(&self) -> &str {
        "chained"
    }

    fn distribution_history(&self, ticker: &Ticker) -> Result<Vec<DistributionEvent>, DataError> {
        let mut outage: Option<DataError> = None;
        let mut last: Option<DataError> = None;

        for source in &self.sources {
            match source.distribution_history(ticker) {
                Ok(events) if !events.is_empty() => return Ok(events),
                Ok(_) => last = Some(DataError::no_data(&ticker.symbol)),
                Err(e) => {
                    debug!(ticker = %ticker, source = source.name(), error = %e, "distribution source failed, trying next");
                    if e.is_source_outage() && outage.is_none() {
                        outage = Some(e);
                    } else {
                        last = Some(e);
                    }
                }
            }
        }

        Err(outage
            .or(last)
            .unwrap_or_else(|| DataError::no_data(&ticker.symbol)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataSource, Frequency, Market};
    use chrono::NaiveDate;

    enum Canned {
        Events(f64),
        NoData,
        Down,
    }

    impl DistributionSource for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn distribution_history(&self, ticker: &Ticker) -> Result<Vec<DistributionEvent>, DataError> {
            match self {
                Canned::Events(amount) => Ok(vec![DistributionEvent {
                    ticker: ticker.symbol.clone(),
                    ex_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    amount: *amount,
                    frequency: Frequency::Monthly,
                    source: DataSource::CsvImport,
                }]),
                Canned::NoData => Err(DataError::no_data(&ticker.symbol)),
                Canned::Down => Err(DataError::fetch_failure(&ticker.symbol, "connection refused")),
            }
        }
    }

    fn ticker() -> Ticker {
        Ticker::new("ZWC", Market::Canada)
    }

    #[test]
    fn primary_wins_when_it_has_data() {
        let (a, b) = (Canned::Events(1.0), Canned::Events(2.0));
        let chain = ChainedDistributionSource::new(vec![&a, &b]);
        assert_eq!(chain.distribution_history(&ticker()).unwrap()[0].amount, 1.0);
    }

    #[test]
    fn falls_back_when_primary_has_nothing() {
        let (a, b) = (Canned::NoData, Canned::Events(2.0));
        let chain = ChainedDistributionSource::new(vec![&a, &b]);
        assert_eq!(chain.distribution_history(&ticker()).unwrap()[0].amount, 2.0);
    }

    #[test]
    fn falls_back_when_primary_is_down() {
        let (a, b) = (Canned::Down, Canned::Events(3.0));
        let chain = ChainedDistributionSource::new(vec![&a, &b]);
        assert_eq!(chain.distribution_history(&ticker()).unwrap()[0].amount, 3.0);
    }

    #[test]
    fn outage_is_reported_over_no_data() {
        let (a, b) = (Canned::Down, Canned::NoData);
        let chain = ChainedDistributionSource::new(vec![&a, &b]);
        let err = chain.distribution_history(&ticker()).unwrap_err();
        assert!(err.is_source_outage());
    }

    #[test]
    fn all_empty_is_no_data() {
        let (a, b) = (Canned::NoData, Canned::NoData);
        let chain = ChainedDistributionSource::new(vec![&a, &b]);
        assert!(matches!(
            chain.distribution_history(&ticker()),
            Err(DataError::NoData { .. })
        ));
        let empty = ChainedDistributionSource::new(vec![]);
        assert!(matches!(
            empty.distribution_history(&ticker()),
            Err(DataError::NoData { .. })
        ));
    }
}
