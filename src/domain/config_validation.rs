//! Configuration validation.
//!
//! Every section is checked before any item is fetched. Present values must
//! parse; absent values fall back to the documented defaults.

use chrono::NaiveDate;
use std::fmt::Display;
use std::str::FromStr;

use crate::domain::backtest::MatchingMode;
use crate::domain::batch::parse_item_tags;
use crate::domain::error::SkytraderError;
use crate::domain::investment::parse_holdings;
use crate::domain::normalizer::MAX_SETTLE_HOURS;
use crate::domain::observation::PriceField;
use crate::domain::strategy::StrategyMode;
use crate::ports::config_port::ConfigPort;

/// Parses a present value, `Ok(None)` when the key is absent or blank.
pub fn read_optional<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, SkytraderError>
where
    T: FromStr,
    T::Err: Display,
{
    config
        .get_trimmed(section, key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| SkytraderError::invalid(section, key, format!("'{raw}': {e}")))
        })
        .transpose()
}

/// A finite number, or `default` when absent.
pub fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, SkytraderError> {
    let value = read_optional::<f64>(config, section, key)?.unwrap_or(default);
    if !value.is_finite() {
        return Err(SkytraderError::invalid(section, key, "must be a finite number"));
    }
    Ok(value)
}

pub fn read_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, SkytraderError> {
    config
        .get_trimmed(section, key)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                SkytraderError::invalid(section, key, "invalid date format, expected YYYY-MM-DD")
            })
        })
        .transpose()
}

/// Upper bound on `[data] history_days`, about a century.
pub const MAX_HISTORY_DAYS: i64 = 36_500;

fn read_bounded_i64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    min: i64,
    max: i64,
) -> Result<Option<i64>, SkytraderError> {
    match read_optional::<i64>(config, section, key)? {
        Some(value) if value < min || value > max => Err(SkytraderError::invalid(
            section,
            key,
            format!("{key} must be between {min} and {max}"),
        )),
        value => Ok(value),
    }
}

/// `[data] history_days`, within 1..=MAX_HISTORY_DAYS.
pub fn read_history_days(config: &dyn ConfigPort) -> Result<Option<i64>, SkytraderError> {
    read_bounded_i64(config, "data", "history_days", 1, MAX_HISTORY_DAYS)
}

/// `[strategy] settle_hours`, within 0..=MAX_SETTLE_HOURS.
pub fn read_settle_hours(config: &dyn ConfigPort) -> Result<Option<i64>, SkytraderError> {
    read_bounded_i64(config, "strategy", "settle_hours", 0, MAX_SETTLE_HOURS)
}

fn require_positive(section: &str, key: &str, value: f64) -> Result<(), SkytraderError> {
    if value <= 0.0 {
        return Err(SkytraderError::invalid(section, key, format!("{key} must be positive")));
    }
    Ok(())
}

fn require_non_negative(section: &str, key: &str, value: f64) -> Result<(), SkytraderError> {
    if value < 0.0 {
        return Err(SkytraderError::invalid(
            section,
            key,
            format!("{key} must be non-negative"),
        ));
    }
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SkytraderError> {
    match config.get_trimmed("data", "source").as_deref() {
        None | Some("coflnet") => {}
        Some("csv") => {
            if config.get_trimmed("data", "csv_dir").is_none() {
                return Err(SkytraderError::ConfigMissing {
                    section: "data".to_string(),
                    key: "csv_dir".to_string(),
                });
            }
        }
        Some(other) => {
            return Err(SkytraderError::invalid(
                "data",
                "source",
                format!("unknown source '{other}', expected coflnet or csv"),
            ));
        }
    }

    if let Some(timeout) = read_optional::<i64>(config, "data", "timeout_secs")? {
        if timeout < 1 {
            return Err(SkytraderError::invalid(
                "data",
                "timeout_secs",
                "timeout_secs must be at least 1",
            ));
        }
    }
    read_history_days(config)?;
    read_date(config, "data", "history_start")?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SkytraderError> {
    read_optional::<StrategyMode>(config, "strategy", "mode")?;
    read_optional::<PriceField>(config, "strategy", "price_field")?;

    match config.get_trimmed("strategy", "policy").as_deref() {
        None | Some("binary") | Some("three_state") => {}
        Some(other) => {
            return Err(SkytraderError::invalid(
                "strategy",
                "policy",
                format!("unknown policy '{other}', expected binary or three_state"),
            ));
        }
    }

    if let Some(window) = read_optional::<i64>(config, "strategy", "window")? {
        if window < 1 {
            return Err(SkytraderError::invalid(
                "strategy",
                "window",
                "window must be at least 1",
            ));
        }
    }

    require_positive("strategy", "alpha", read_f64(config, "strategy", "alpha", 1.0)?)?;
    require_non_negative("strategy", "beta", read_f64(config, "strategy", "beta", 0.0)?)?;
    require_positive("strategy", "gamma", read_f64(config, "strategy", "gamma", 1.0)?)?;

    read_settle_hours(config)?;
    Ok(())
}

/// Checks `[backtest]`. The item list is required only when `require_items`.
pub fn validate_backtest_config(
    config: &dyn ConfigPort,
    require_items: bool,
) -> Result<(), SkytraderError> {
    match config.get_trimmed("backtest", "items") {
        Some(items) => {
            parse_item_tags(&items)?;
        }
        None if require_items => {
            return Err(SkytraderError::ConfigMissing {
                section: "backtest".to_string(),
                key: "items".to_string(),
            });
        }
        None => {}
    }

    require_non_negative(
        "backtest",
        "fixed_spread",
        read_f64(config, "backtest", "fixed_spread", 0.0)?,
    )?;
    require_positive(
        "backtest",
        "lot_size",
        read_f64(config, "backtest", "lot_size", 1.0)?,
    )?;

    let fee_factor = read_f64(config, "backtest", "fee_factor", 1.0)?;
    if fee_factor <= 0.0 || fee_factor > 1.0 {
        return Err(SkytraderError::invalid(
            "backtest",
            "fee_factor",
            "fee_factor must be in (0, 1]",
        ));
    }

    match config.get_trimmed("backtest", "sale_fee").as_deref() {
        None | Some("factor") | Some("auction_tax") => {}
        Some(other) => {
            return Err(SkytraderError::invalid(
                "backtest",
                "sale_fee",
                format!("unknown sale fee '{other}', expected factor or auction_tax"),
            ));
        }
    }

    read_optional::<MatchingMode>(config, "backtest", "matching")?;
    Ok(())
}

pub fn validate_threshold_config(config: &dyn ConfigPort) -> Result<(), SkytraderError> {
    for key in ["min_profit", "bazaar_min_pct", "auction_min_pct", "gap_min_margin"] {
        require_non_negative("thresholds", key, read_f64(config, "thresholds", key, 0.0)?)?;
    }

    let discount = read_f64(config, "thresholds", "gap_discount", 0.0)?;
    if !(0.0..1.0).contains(&discount) {
        return Err(SkytraderError::invalid(
            "thresholds",
            "gap_discount",
            "gap_discount must be in [0, 1)",
        ));
    }
    Ok(())
}

pub fn validate_investments_config(config: &dyn ConfigPort) -> Result<(), SkytraderError> {
    for key in ["bazaar", "auction"] {
        if let Some(list) = config.get_trimmed("investments", key) {
            parse_holdings(&list)?;
        }
    }
    if let Some(items) = config.get_trimmed("auction", "items") {
        parse_item_tags(&items)?;
    }
    Ok(())
}

/// Runs every section check.
pub fn validate_all(config: &dyn ConfigPort) -> Result<(), SkytraderError> {
    validate_data_config(config)?;
    validate_strategy_config(config)?;
    validate_backtest_config(config, false)?;
    validate_threshold_config(config)?;
    validate_investments_config(config)?;
    Ok(())
}
