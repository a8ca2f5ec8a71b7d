//! Pipeline-level errors.

use thiserror::Error;
use yieldwatch_core::domain::Market;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Errors from a snapshot or history run.
///
/// Per-ticker problems never show up here; they are logged and the ticker is
/// skipped. Only failures that make the whole run meaningless do.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("{market}: data source unreachable for all {attempted} tickers, output files left unchanged")]
    TotalOutage { market: Market, attempted: usize },
}
