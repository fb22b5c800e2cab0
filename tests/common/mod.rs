#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use skytrader::domain::auction::AuctionListing;
use skytrader::domain::backtest::BacktestConfig;
use skytrader::domain::error::SkytraderError;
use skytrader::domain::observation::{BazaarSnapshot, PriceField, RawObservation};
use skytrader::domain::policy::PositionPolicy;
use skytrader::domain::strategy::Strategy;
use skytrader::ports::market_data_port::{AuctionDataPort, MarketDataPort, SeriesRange};
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockDataPort {
    pub series: HashMap<String, Vec<RawObservation>>,
    pub snapshots: HashMap<String, BazaarSnapshot>,
    pub sold: HashMap<String, Vec<AuctionListing>>,
    pub active: HashMap<String, Vec<AuctionListing>>,
    pub errors: HashMap<String, String>,
    pub requested: RefCell<Vec<String>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            snapshots: HashMap::new(),
            sold: HashMap::new(),
            active: HashMap::new(),
            errors: HashMap::new(),
            requested: RefCell::new(Vec::new()),
        }
    }

    pub fn with_series(mut self, tag: &str, rows: Vec<RawObservation>) -> Self {
        self.series.insert(tag.to_string(), rows);
        self
    }

    pub fn with_snapshot(mut self, snapshot: BazaarSnapshot) -> Self {
        self.snapshots.insert(snapshot.item_tag.clone(), snapshot);
        self
    }

    pub fn with_auctions(
        mut self,
        tag: &str,
        sold: Vec<AuctionListing>,
        active: Vec<AuctionListing>,
    ) -> Self {
        self.sold.insert(tag.to_string(), sold);
        self.active.insert(tag.to_string(), active);
        self
    }

    pub fn with_error(mut self, tag: &str, reason: &str) -> Self {
        self.errors.insert(tag.to_string(), reason.to_string());
        self
    }

    fn check_error(&self, tag: &str) -> Result<(), SkytraderError> {
        self.requested.borrow_mut().push(tag.to_string());
        match self.errors.get(tag) {
            Some(reason) => Err(SkytraderError::fetch(tag, reason)),
            None => Ok(()),
        }
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_series(
        &self,
        item_tag: &str,
        _range: &SeriesRange,
    ) -> Result<Vec<RawObservation>, SkytraderError> {
        self.check_error(item_tag)?;
        Ok(self.series.get(item_tag).cloned().unwrap_or_default())
    }

    fn fetch_snapshot(&self, item_tag: &str) -> Result<BazaarSnapshot, SkytraderError> {
        self.check_error(item_tag)?;
        self.snapshots
            .get(item_tag)
            .cloned()
            .ok_or_else(|| SkytraderError::fetch(item_tag, "API request failed: 404 Not Found"))
    }

    fn list_item_tags(&self) -> Result<Vec<String>, SkytraderError> {
        let mut tags: Vec<String> = self
            .snapshots
            .keys()
            .chain(self.errors.keys())
            .cloned()
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }
}

impl AuctionDataPort for MockDataPort {
    fn fetch_active_bins(&self, item_tag: &str) -> Result<Vec<AuctionListing>, SkytraderError> {
        self.check_error(item_tag)?;
        Ok(self.active.get(item_tag).cloned().unwrap_or_default())
    }

    fn fetch_sold(&self, item_tag: &str) -> Result<Vec<AuctionListing>, SkytraderError> {
        self.check_error(item_tag)?;
        Ok(self.sold.get(item_tag).cloned().unwrap_or_default())
    }
}

pub fn ts(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// A complete row with buy and sell volume of 4000 each (two lots at the default lot size).
pub fn obs(day: u32, buy: f64, sell: f64) -> RawObservation {
    RawObservation {
        timestamp: Some(ts(day)),
        buy_price: Some(buy),
        sell_price: Some(sell),
        buy_volume: Some(4000.0),
        sell_volume: Some(4000.0),
    }
}

pub fn snapshot(tag: &str, buy: f64, sell: f64) -> BazaarSnapshot {
    BazaarSnapshot {
        item_tag: tag.to_string(),
        timestamp: Some(now()),
        buy_price: buy,
        sell_price: sell,
        buy_volume: 50_000.0,
        sell_volume: 50_000.0,
        buy_orders: Some(200),
        sell_orders: Some(200),
    }
}

pub fn listing(price: f64, day: u32) -> AuctionListing {
    AuctionListing {
        item_name: Some("Hyperion".to_string()),
        starting_bid: price,
        start: Some(ts(day)),
    }
}

/// Window of one with a binary policy whose target is the buy price itself.
pub fn passthrough_strategy() -> Strategy {
    Strategy {
        name: "passthrough".to_string(),
        policy: PositionPolicy::Binary {
            alpha: 1.0,
            beta: 0.0,
        },
        window: 1,
        price_field: PriceField::Buy,
        settle_hours: None,
    }
}

/// Window of one, three-state with gamma 1.2; target is the buy price.
pub fn three_state_strategy() -> Strategy {
    Strategy {
        name: "three_state".to_string(),
        policy: PositionPolicy::ThreeState {
            alpha: 1.0,
            gamma: 1.2,
        },
        window: 1,
        price_field: PriceField::Buy,
        settle_hours: None,
    }
}

pub fn default_config() -> BacktestConfig {
    BacktestConfig::default()
}

/// Flat, Long (enter), Flat (exit), Long (enter, left open).
///
/// Entry at 100.1, exit at 0.98875 * 120 - 0.1 = 118.55, two units:
/// profit 36.9 on 200.2 invested.
pub fn round_trip_series() -> Vec<RawObservation> {
    vec![
        obs(1, 100.0, 110.0),
        obs(2, 120.0, 100.0),
        obs(3, 120.0, 130.0),
        obs(4, 100.0, 90.0),
    ]
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
