//! Market partition and ticker symbols.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Listing market. Each market has its own watchlist and output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Canada,
    Us,
}

impl Market {
    pub const ALL: [Market; 2] = [Market::Canada, Market::Us];

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Canada => "canada",
            Market::Us => "us",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canada" | "ca" | "tsx" => Ok(Market::Canada),
            "us" | "usa" => Ok(Market::Us),
            other => Err(format!("unknown market '{other}' (expected canada or us)")),
        }
    }
}

/// A watchlist symbol qualified by its market.
///
/// `symbol` is kept exactly as written in the watchlist; it is the key used in
/// every output file. [`Ticker::provider_symbol`] gives the form the market-data
/// provider expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub market: Market,
}

impl Ticker {
    pub fn new(symbol: impl Into<String>, market: Market) -> Self {
        Self {
            symbol: symbol.into().trim().to_string(),
            market,
        }
    }

    /// Provider form of the symbol.
    ///
    /// Drops `$` and any `EXCHANGE:` prefix. Canadian listings lose `.TO`/`.NE`,
    /// unit trusts go from `-UN` to `.UN`, and `.TO` is appended.
    pub fn provider_symbol(&self) -> String {
        let bare = self.symbol.replace('$', "");
        let bare = bare.rsplit(':').next().unwrap_or_default();
        match self.market {
            Market::Canada => {
                let clean = bare
                    .replace("-UN", ".UN")
                    .replace(".TO", "")
                    .replace(".NE", "");
                format!("{clean}.TO")
            }
            Market::Us => bare.to_string(),
        }
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_parses_aliases() {
        assert_eq!("Canada".parse::<Market>().unwrap(), Market::Canada);
        assert_eq!("TSX".parse::<Market>().unwrap(), Market::Canada);
        assert_eq!(" us ".parse::<Market>().unwrap(), Market::Us);
        assert!("eu".parse::<Market>().is_err());
    }

    #[test]
    fn us_symbol_is_passed_through() {
        let t = Ticker::new("JEPI", Market::Us);
        assert_eq!(t.provider_symbol(), "JEPI");
    }

    #[test]
    fn us_symbol_drops_exchange_prefix() {
        let t = Ticker::new("NASDAQ:QYLD", Market::Us);
        assert_eq!(t.provider_symbol(), "QYLD");
    }

    #[test]
    fn canadian_symbol_gets_tsx_suffix() {
        assert_eq!(Ticker::new("HYLD", Market::Canada).provider_symbol(), "HYLD.TO");
        assert_eq!(Ticker::new("HYLD.TO", Market::Canada).provider_symbol(), "HYLD.TO");
        assert_eq!(Ticker::new("EMCL.NE", Market::Canada).provider_symbol(), "EMCL.TO");
    }

    #[test]
    fn canadian_unit_trust_uses_dot_un() {
        let t = Ticker::new("TSX:$HR-UN", Market::Canada);
        assert_eq!(t.provider_symbol(), "HR.UN.TO");
    }

    #[test]
    fn ticker_trims_whitespace() {
        let t = Ticker::new("  XYLD \n", Market::Us);
        assert_eq!(t.symbol, "XYLD");
    }
}
