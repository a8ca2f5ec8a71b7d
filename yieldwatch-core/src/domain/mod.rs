//! Domain types for yieldwatch

pub mod distribution;
pub mod frequency;
pub mod market;

pub use distribution::{DataSource, DistributionEvent, YieldRecord};
pub use frequency::Frequency;
pub use market::{Market, Ticker};
