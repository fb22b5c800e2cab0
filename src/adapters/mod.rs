//! Concrete adapter implementations for ports.

#[cfg(feature = "http")]
pub mod coflnet_adapter;
pub mod console_report_adapter;
pub mod csv_adapter;
pub mod csv_trade_report_adapter;
pub mod file_config_adapter;
