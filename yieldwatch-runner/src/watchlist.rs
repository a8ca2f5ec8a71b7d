//! Per-market ticker watchlists.

use std::io;
use std::path::Path;

use tracing::warn;
use yieldwatch_core::domain::{Market, Ticker};

/// Parse a watchlist: one symbol per line, blank lines and `#` comments ignored.
/// Repeated symbols keep their first position.
pub fn parse_watchlist(content: &str, market: Market) -> Vec<Ticker> {
    let mut tickers: Vec<Ticker> = Vec::new();
    for line in content.lines() {
        let symbol = line.trim();
        if symbol.is_empty() || symbol.starts_with('#') {
            continue;
        }
        if tickers.iter().any(|t| t.symbol == symbol) {
            continue;
        }
        tickers.push(Ticker::new(symbol, market));
    }
    tickers
}

/// Read a watchlist file. A missing file is an empty watchlist.
pub fn load_watchlist(path: &Path, market: Market) -> io::Result<Vec<Ticker>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse_watchlist(&content, market)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), %market, "watchlist not found, nothing to track");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}
