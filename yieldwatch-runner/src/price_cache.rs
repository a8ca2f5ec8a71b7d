//! Persistent cache of historical closes.
//!
//! Keyed by `{provider_symbol}_{YYYY-MM-DD}` and stored as one JSON object, so
//! a history run only asks the provider for prices it has never seen.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use yieldwatch_core::data::{DataError, PricePoint, PriceSource};
use yieldwatch_core::domain::Ticker;

use crate::storage::StorageError;

/// A cached value as found on disk. Older caches store a bare close.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPrice {
    Point(PricePoint),
    Close(f64),
}

/// Date part of a `{symbol}_{YYYY-MM-DD}` key.
fn key_date(key: &str) -> Option<NaiveDate> {
    let (_, date) = key.rsplit_once('_')?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn into_points(stored: BTreeMap<String, StoredPrice>) -> BTreeMap<String, PricePoint> {
    stored
        .into_iter()
        .filter_map(|(key, value)| {
            let point = match value {
                StoredPrice::Point(point) => point,
                StoredPrice::Close(price) => PricePoint {
                    date: key_date(&key)?,
                    price,
                },
            };
            Some((key, point))
        })
        .collect()
}

#[derive(Debug, Default)]
struct Entries {
    prices: BTreeMap<String, PricePoint>,
    dirty: bool,
}

#[derive(Debug)]
pub struct PriceCache {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl PriceCache {
    /// Load the cache at `path`. A missing file starts empty; an unreadable
    /// one is logged and also starts empty, since every entry can be refetched.
    /// Entries holding a bare close take their date from the key.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let prices = match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<BTreeMap<String, StoredPrice>>(&json) {
                Ok(stored) => into_points(stored),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "price cache unreadable, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        debug!(path = %path.display(), entries = prices.len(), "price cache loaded");
        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(Entries {
                prices,
                dirty: false,
            }),
        })
    }

    fn key(ticker: &Ticker, date: NaiveDate) -> String {
        format!("{}_{}", ticker.provider_symbol(), date.format("%Y-%m-%d"))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, ticker: &Ticker, date: NaiveDate) -> Option<PricePoint> {
        self.lock().prices.get(&Self::key(ticker, date)).copied()
    }

    pub fn insert(&self, ticker: &Ticker, date: NaiveDate, point: PricePoint) {
        let mut entries = self.lock();
        entries.prices.insert(Self::key(ticker, date), point);
        entries.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.lock().prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the cache back if anything was added since it was loaded.
    pub fn save(&self) -> Result<(), StorageError> {
        let mut entries = self.lock();
        if !entries.dirty {
            return Ok(());
        }
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&entries.prices)
            .map_err(|e| io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        std::fs::write(&self.path, json).map_err(io_err)?;
        entries.dirty = false;
        debug!(path = %self.path.display(), entries = entries.prices.len(), "price cache saved");
        Ok(())
    }
}

/// A [`PriceSource`] that answers `price_on` from the cache when it can.
///
/// Only dates strictly before today are cached; a close for today or later
/// may still change. `latest_price` always goes to the inner source.
pub struct CachedPriceSource<'a, P: PriceSource> {
    inner: P,
    cache: &'a PriceCache,
}

impl<'a, P: PriceSource> CachedPriceSource<'a, P> {
    pub fn new(inner: P, cache: &'a PriceCache) -> Self {
        Self { inner, cache }
    }
}

impl<P: PriceSource> PriceSource for CachedPriceSource<'_, P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn latest_price(&self, ticker: &Ticker) -> Result<PricePoint, DataError> {
        self.inner.latest_price(ticker)
    }

    fn price_on(&self, ticker: &Ticker, date: NaiveDate) -> Result<PricePoint, DataError> {
        if let Some(point) = self.cache.get(ticker, date) {
            debug!(ticker = %ticker, %date, "price cache hit");
            return Ok(point);
        }
        let point = self.inner.price_on(ticker, date)?;
        if date < Utc::now().date_naive() {
            self.cache.insert(ticker, date, point);
        }
        Ok(point)
    }
}
