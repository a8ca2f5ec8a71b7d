//! Yieldwatch Runner: pipelines, persistence, and configuration.
//!
//! This crate builds on `yieldwatch-core` to provide:
//! - TOML configuration naming every file a run touches
//! - Watchlist loading
//! - CSV storage for the append-only history, the stats, and the snapshot
//! - A persistent price cache in front of any price source
//! - The snapshot and history pipelines, with per-ticker progress reporting

pub mod config;
pub mod error;
pub mod history;
pub mod price_cache;
pub mod progress;
pub mod snapshot;
pub mod storage;
pub mod watchlist;

pub use config::{ConfigError, HttpConfig, MarketFiles, TrackerConfig, DEFAULT_CONFIG_FILE};
pub use error::RunError;
pub use history::{run_history, update_series, HistoryReport, TickerUpdate};
pub use price_cache::{CachedPriceSource, PriceCache};
pub use progress::{LogProgress, RunProgress, SilentProgress};
pub use snapshot::{build_snapshot, run_snapshot, SnapshotContext, SnapshotReport, SnapshotRow, Valuation};
pub use storage::StorageError;
pub use watchlist::{load_watchlist, parse_watchlist};
