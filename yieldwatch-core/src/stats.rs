//! Summary statistics over a ticker's yield history.
//!
//! Stats are a derived view: they are rebuilt from the full series on every
//! run and never updated incrementally.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::series::HistoricalSeries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldStats {
    pub ticker: String,
    pub mean_yield: f64,
    pub median_yield: f64,
    /// Sample standard deviation; `None` for a single observation.
    pub stddev_yield: Option<f64>,
    pub sample_count: usize,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();
    Some(if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    })
}

/// Sample standard deviation (divides by n - 1). Undefined below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Stats for one series, or `None` when it has no records.
pub fn compute_stats(series: &HistoricalSeries) -> Option<YieldStats> {
    let yields = series.yields();
    Some(YieldStats {
        ticker: series.ticker().to_string(),
        mean_yield: mean(&yields)?,
        median_yield: median(&yields)?,
        stddev_yield: sample_std_dev(&yields),
        sample_count: yields.len(),
    })
}

/// Stats for every non-empty series, highest mean first, ticker ascending on ties.
pub fn compute_all<'a, I>(series: I) -> Vec<YieldStats>
where
    I: IntoIterator<Item = &'a HistoricalSeries>,
{
    let mut rows: Vec<YieldStats> = series.into_iter().filter_map(compute_stats).collect();
    rows.sort_by(|a, b| {
        b.mean_yield
            .partial_cmp(&a.mean_yield)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    rows
}
