//! Per-ticker progress reporting for pipeline runs.

use tracing::{info, warn};

/// Progress callback for a batch of tickers.
pub trait RunProgress: Send + Sync {
    /// Called when starting a ticker.
    fn on_start(&self, ticker: &str, index: usize, total: usize);

    /// Called when a ticker finishes. `Err` carries the reason it was skipped.
    fn on_complete(&self, ticker: &str, index: usize, total: usize, result: Result<(), &str>);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Forwards progress to `tracing`.
pub struct LogProgress;

impl RunProgress for LogProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize) {
        info!("[{}/{}] {ticker}", index + 1, total);
    }

    fn on_complete(&self, ticker: &str, _index: usize, _total: usize, result: Result<(), &str>) {
        if let Err(reason) = result {
            warn!(ticker, reason, "skipped");
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        info!(succeeded, failed, total, "batch complete");
    }
}

/// Discards all progress.
pub struct SilentProgress;

impl RunProgress for SilentProgress {
    fn on_start(&self, _ticker: &str, _index: usize, _total: usize) {}

    fn on_complete(&self, _ticker: &str, _index: usize, _total: usize, _result: Result<(), &str>) {}

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}
