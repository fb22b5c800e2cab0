//! Core domain types and logic.

pub mod observation;
pub mod rolling;
pub mod normalizer;
pub mod signal;
pub mod policy;
pub mod strategy;
pub mod tax;
pub mod backtest;
pub mod results;
pub mod batch;
pub mod investment;
pub mod flip;
pub mod auction;
pub mod screening;
pub mod config_validation;
pub mod error;
