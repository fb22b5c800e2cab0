//! Price observations as delivered by a data provider and after cleaning.

use chrono::{DateTime, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// Observation as fetched; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawObservation {
    pub timestamp: Option<NaiveDateTime>,
    pub buy_price: Option<f64>,
    pub sell_price: Option<f64>,
    pub buy_volume: Option<f64>,
    pub sell_volume: Option<f64>,
}

impl RawObservation {
    /// Returns the complete observation, or `None` if any field is missing,
    /// non-finite, or a volume is negative.
    pub fn complete(&self) -> Option<PriceObservation> {
        let price = |v: Option<f64>| v.filter(|p| p.is_finite());
        let volume = |v: Option<f64>| v.filter(|q| q.is_finite() && *q >= 0.0);

        Some(PriceObservation {
            timestamp: self.timestamp?,
            buy_price: price(self.buy_price)?,
            sell_price: price(self.sell_price)?,
            buy_volume: volume(self.buy_volume)?,
            sell_volume: volume(self.sell_volume)?,
        })
    }
}

/// One complete price/volume sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub timestamp: NaiveDateTime,
    pub buy_price: f64,
    pub sell_price: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
}

impl PriceObservation {
    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Buy => self.buy_price,
            PriceField::Sell => self.sell_price,
        }
    }

    /// (buy_volume + sell_volume) / 2
    pub fn mean_volume(&self) -> f64 {
        (self.buy_volume + self.sell_volume) / 2.0
    }
}

impl From<PriceObservation> for RawObservation {
    fn from(obs: PriceObservation) -> Self {
        RawObservation {
            timestamp: Some(obs.timestamp),
            buy_price: Some(obs.buy_price),
            sell_price: Some(obs.sell_price),
            buy_volume: Some(obs.buy_volume),
            sell_volume: Some(obs.sell_volume),
        }
    }
}

/// Price column used as the statistical baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceField {
    #[default]
    Buy,
    Sell,
}

impl FromStr for PriceField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(PriceField::Buy),
            "sell" => Ok(PriceField::Sell),
            other => Err(format!("unknown price field '{other}', expected buy or sell")),
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceField::Buy => write!(f, "buy"),
            PriceField::Sell => write!(f, "sell"),
        }
    }
}

/// Live bazaar quote for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct BazaarSnapshot {
    pub item_tag: String,
    pub timestamp: Option<NaiveDateTime>,
    pub buy_price: f64,
    pub sell_price: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub buy_orders: Option<u64>,
    pub sell_orders: Option<u64>,
}

impl BazaarSnapshot {
    pub fn to_raw(&self) -> RawObservation {
        RawObservation {
            timestamp: self.timestamp,
            buy_price: Some(self.buy_price),
            sell_price: Some(self.sell_price),
            buy_volume: Some(self.buy_volume),
            sell_volume: Some(self.sell_volume),
        }
    }
}

/// Parses the API's timestamp formats: RFC 3339 (offset converted to UTC) or a
/// naive `YYYY-MM-DDTHH:MM:SS[.fff]`.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}
