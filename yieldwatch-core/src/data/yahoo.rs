//! Yahoo Finance provider.
//!
//! Prices and distributions both come from the v8 chart API: daily closes for
//! price lookups and `events=div` for the distribution history. Handles rate
//! limiting, retries with exponential backoff, and the circuit breaker.
//!
//! Yahoo has no official API and is subject to unannounced format changes;
//! the CSV import source is the fallback for distributions.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DistributionSource, PriceSource, PricePoint};
use crate::domain::{DataSource, DistributionEvent, Ticker};
use crate::inference::infer_frequencies;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sessions looked at on either side of a requested date.
const PRICE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    events: Option<ChartEvents>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: HashMap<String, DividendData>,
}

#[derive(Debug, Deserialize)]
struct DividendData {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// What a chart request asks for.
#[derive(Debug, Clone, Copy)]
enum ChartQuery {
    Latest,
    Window { start: NaiveDate, end: NaiveDate },
    Dividends,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::fetch_failure("yahoo_finance", e))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries,
            base_delay: Duration::from_millis(500),
        })
    }

    fn chart_url(symbol: &str, query: ChartQuery) -> String {
        let base = format!("https://query2.finance.yahoo.com/v8/finance/chart/{symbol}");
        match query {
            ChartQuery::Latest => format!("{base}?range=5d&interval=1d"),
            ChartQuery::Window { start, end } => {
                let start_ts = day_start_ts(start);
                let end_ts = day_start_ts(end) + 86_399;
                format!("{base}?period1={start_ts}&period2={end_ts}&interval=1d")
            }
            ChartQuery::Dividends => format!("{base}?range=max&interval=1mo&events=div"),
        }
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<ChartData, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::no_data(symbol),
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))
    }

    /// Daily closes in the response, skipping sessions without a close.
    fn closes(data: &ChartData) -> Vec<PricePoint> {
        let Some(timestamps) = data.timestamp.as_ref() else {
            return Vec::new();
        };
        let Some(quote) = data.indicators.as_ref().and_then(|i| i.quote.first()) else {
            return Vec::new();
        };

        timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let price = quote.close.get(i).copied().flatten()?;
                let date = ts_to_date(ts)?;
                (price.is_finite() && price > 0.0).then_some(PricePoint { date, price })
            })
            .collect()
    }

    /// Close on `date` if traded, else the nearest session (earlier wins a tie).
    fn nearest_close(points: &[PricePoint], date: NaiveDate) -> Option<PricePoint> {
        points
            .iter()
            .min_by_key(|p| ((p.date - date).num_days().abs(), p.date > date))
            .copied()
    }

    fn latest_from(data: &ChartData) -> Option<PricePoint> {
        let meta_price = data
            .meta
            .regular_market_price
            .filter(|p| p.is_finite() && *p > 0.0);
        let meta_date = data.meta.regular_market_time.and_then(ts_to_date);
        match (meta_price, meta_date) {
            (Some(price), Some(date)) => Some(PricePoint { date, price }),
            _ => Self::closes(data).last().copied(),
        }
    }

    /// Distribution events in the response, oldest first, with inferred frequencies.
    fn dividend_events(ticker: &Ticker, data: &ChartData) -> Vec<DistributionEvent> {
        let mut raw: Vec<(NaiveDate, f64)> = data
            .events
            .as_ref()
            .map(|ev| {
                ev.dividends
                    .values()
                    .filter(|d| d.amount.is_finite() && d.amount >= 0.0)
                    .filter_map(|d| Some((ts_to_date(d.date)?, d.amount)))
                    .collect()
            })
            .unwrap_or_default();
        raw.sort_by_key(|(date, _)| *date);
        raw.dedup_by_key(|(date, _)| *date);

        let frequencies = infer_frequencies(&raw);
        raw.into_iter()
            .zip(frequencies)
            .map(|((ex_date, amount), frequency)| DistributionEvent {
                ticker: ticker.symbol.clone(),
                ex_date,
                amount,
                frequency,
                source: DataSource::YahooFinance,
            })
            .collect()
    }

    /// Execute a chart request with retry and circuit breaker logic.
    fn fetch_chart(&self, symbol: &str, query: ChartQuery) -> Result<ChartData, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(symbol, query);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying chart request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::fetch_failure(symbol, e));
                    continue;
                }
                Err(e) => return Err(DataError::fetch_failure(symbol, e)),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                warn!(symbol, "provider returned 403; tripping circuit breaker");
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                self.circuit_breaker.record_success();
                return Err(DataError::no_data(symbol));
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::fetch_failure(symbol, format!("HTTP {status}")));
                continue;
            }

            let chart: ChartResponse = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
            })?;
            self.circuit_breaker.record_success();
            return Self::parse_response(symbol, chart);
        }

        Err(last_error.unwrap_or_else(|| DataError::fetch_failure(symbol, "max retries exceeded")))
    }
}

impl PriceSource for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn latest_price(&self, ticker: &Ticker) -> Result<PricePoint, DataError> {
        let symbol = ticker.provider_symbol();
        let data = self.fetch_chart(&symbol, ChartQuery::Latest)?;
        Self::latest_from(&data).ok_or_else(|| DataError::no_data(&ticker.symbol))
    }

    fn price_on(&self, ticker: &Ticker, date: NaiveDate) -> Result<PricePoint, DataError> {
        let symbol = ticker.provider_symbol();
        let query = ChartQuery::Window {
            start: date - ChronoDuration::days(PRICE_WINDOW_DAYS),
            end: date + ChronoDuration::days(PRICE_WINDOW_DAYS),
        };
        let missing = || DataError::MissingPrice {
            symbol: ticker.symbol.clone(),
            date,
        };
        let data = match self.fetch_chart(&symbol, query) {
            Ok(data) => data,
            Err(DataError::NoData { .. }) => return Err(missing()),
            Err(e) => return Err(e),
        };
        Self::nearest_close(&Self::closes(&data), date).ok_or_else(missing)
    }
}

impl DistributionSource for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn distribution_history(&self, ticker: &Ticker) -> Result<Vec<DistributionEvent>, DataError> {
        let symbol = ticker.provider_symbol();
        let data = self.fetch_chart(&symbol, ChartQuery::Dividends)?;
        let events = Self::dividend_events(ticker, &data);
        if events.is_empty() {
            return Err(DataError::no_data(&ticker.symbol));
        }
        Ok(events)
    }
}

fn day_start_ts(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

fn ts_to_date(ts: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}
