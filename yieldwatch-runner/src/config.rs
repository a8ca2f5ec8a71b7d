//! Tracker configuration loaded from `yieldwatch.toml`.
//!
//! Every path a run touches is named here and handed to the pipelines
//! explicitly. A missing file means the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use yieldwatch_core::domain::Market;

pub const DEFAULT_CONFIG_FILE: &str = "yieldwatch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Files for one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketFiles {
    /// Watchlist, one symbol per line.
    pub tickers: PathBuf,
    /// Current-yield snapshot, overwritten on every run.
    pub snapshot: PathBuf,
    /// Append-only yield history.
    pub history: PathBuf,
    /// Per-ticker stats, overwritten on every run.
    pub stats: PathBuf,
}

impl MarketFiles {
    fn defaults_for(market: Market) -> Self {
        let suffix = market.as_str();
        Self {
            tickers: PathBuf::from(format!("tickers_{suffix}.txt")),
            snapshot: PathBuf::from(format!("current_etf_yields_{suffix}.csv")),
            history: PathBuf::from(format!("historical_yield_{suffix}.csv")),
            stats: PathBuf::from(format!("yield_stats_{suffix}.csv")),
        }
    }

    /// Resolve relative paths against `base`.
    fn rebased(&self, base: &Path) -> Self {
        Self {
            tickers: base.join(&self.tickers),
            snapshot: base.join(&self.snapshot),
            history: base.join(&self.history),
            stats: base.join(&self.stats),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketsConfig {
    pub canada: MarketFiles,
    pub us: MarketFiles,
}

impl Default for MarketsConfig {
    fn default() -> Self {
        Self {
            canada: MarketFiles::defaults_for(Market::Canada),
            us: MarketFiles::defaults_for(Market::Us),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// JSON cache of historical closes.
    pub price_cache: PathBuf,
    pub http: HttpConfig,
    pub markets: MarketsConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            price_cache: PathBuf::from("price_cache.json"),
            http: HttpConfig::default(),
            markets: MarketsConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            info!(path = %path.display(), "loading config");
            Self::from_file(path)
        } else {
            info!(path = %path.display(), "config not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Resolve every relative path against `base` (usually the config file's directory).
    pub fn rebased(&self, base: &Path) -> Self {
        Self {
            price_cache: base.join(&self.price_cache),
            http: self.http.clone(),
            markets: MarketsConfig {
                canada: self.markets.canada.rebased(base),
                us: self.markets.us.rebased(base),
            },
        }
    }

    pub fn files(&self, market: Market) -> &MarketFiles {
        match market {
            Market::Canada => &self.markets.canada,
            Market::Us => &self.markets.us,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be > 0".into()));
        }
        for market in Market::ALL {
            let files = self.files(market);
            if files.history == files.snapshot || files.history == files.stats {
                return Err(ConfigError::Invalid(format!(
                    "{market}: history file must differ from snapshot and stats files"
                )));
            }
        }
        Ok(())
    }
}
