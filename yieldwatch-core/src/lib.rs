//! Yieldwatch Core: domain types, yield math, history series, and data sources.
//!
//! This crate holds everything that does not touch the filesystem layout of a
//! tracking run:
//! - Domain types (markets, tickers, frequencies, distribution events, yield records)
//! - Annualized yield calculation
//! - Append-only per-ticker yield history
//! - Summary statistics over a history
//! - Payment frequency inference from ex-date spacing
//! - Price and distribution source traits, with Yahoo Finance and CSV import sources

pub mod data;
pub mod domain;
pub mod inference;
pub mod series;
pub mod stats;
pub mod yield_calc;
