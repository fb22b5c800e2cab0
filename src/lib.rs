//! skytrader: signal evaluation and backtesting for SkyBlock bazaar and
//! auction house prices.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command dispatch in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
