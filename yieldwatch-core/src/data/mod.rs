//! Price and distribution sources

pub mod chain;
pub mod circuit_breaker;
pub mod csv_import;
pub mod provider;
pub mod yahoo;

pub use chain::ChainedDistributionSource;
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use csv_import::CsvDistributionSource;
pub use provider::{DataError, DistributionSource, PricePoint, PriceSource};
pub use yahoo::YahooProvider;
