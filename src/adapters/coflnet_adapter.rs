//! HTTP adapter for the public SkyBlock market API (sky.coflnet.com).
//!
//! Every request carries the configured timeout. Non-2xx statuses, transport
//! failures and malformed bodies all become `SkytraderError::Fetch`.

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::auction::AuctionListing;
use crate::domain::error::SkytraderError;
use crate::domain::observation::{parse_timestamp, BazaarSnapshot, RawObservation};
use crate::ports::market_data_port::{AuctionDataPort, MarketDataPort, SeriesRange};

const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntry {
    timestamp: Option<String>,
    buy: Option<f64>,
    sell: Option<f64>,
    buy_volume: Option<f64>,
    sell_volume: Option<f64>,
}

impl HistoryEntry {
    fn into_raw(self) -> RawObservation {
        RawObservation {
            timestamp: self.timestamp.as_deref().and_then(parse_timestamp),
            buy_price: self.buy,
            sell_price: self.sell,
            buy_volume: self.buy_volume,
            sell_volume: self.sell_volume,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotResponse {
    buy_price: Option<f64>,
    sell_price: Option<f64>,
    buy_volume: Option<f64>,
    sell_volume: Option<f64>,
    buy_orders_count: Option<u64>,
    sell_orders_count: Option<u64>,
    time_stamp: Option<String>,
}

impl SnapshotResponse {
    fn into_snapshot(self, item_tag: &str) -> Result<BazaarSnapshot, SkytraderError> {
        let (Some(buy_price), Some(sell_price)) = (self.buy_price, self.sell_price) else {
            return Err(SkytraderError::fetch(item_tag, "snapshot has no prices"));
        };
        Ok(BazaarSnapshot {
            item_tag: item_tag.to_string(),
            timestamp: self.time_stamp.as_deref().and_then(parse_timestamp),
            buy_price,
            sell_price,
            buy_volume: self.buy_volume.unwrap_or(0.0),
            sell_volume: self.sell_volume.unwrap_or(0.0),
            buy_orders: self.buy_orders_count,
            sell_orders: self.sell_orders_count,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuctionEntry {
    item_name: Option<String>,
    starting_bid: Option<f64>,
    start: Option<String>,
}

fn to_listings(entries: Vec<AuctionEntry>) -> Vec<AuctionListing> {
    entries
        .into_iter()
        .filter_map(|e| {
            Some(AuctionListing {
                starting_bid: e.starting_bid?,
                start: e.start.as_deref().and_then(parse_timestamp),
                item_name: e.item_name,
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct CoflnetAdapter {
    client: Client,
    base_url: String,
}

impl CoflnetAdapter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SkytraderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SkytraderError::fetch("*", format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        item_tag: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SkytraderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| SkytraderError::fetch(item_tag, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SkytraderError::fetch(
                item_tag,
                format!("API request failed: {status}"),
            ));
        }

        response
            .json::<T>()
            .map_err(|e| SkytraderError::fetch(item_tag, format!("malformed response: {e}")))
    }
}

impl MarketDataPort for CoflnetAdapter {
    fn fetch_series(
        &self,
        item_tag: &str,
        range: &SeriesRange,
    ) -> Result<Vec<RawObservation>, SkytraderError> {
        match range {
            SeriesRange::Between { from, to } => {
                let query = [
                    ("start", from.format(QUERY_TIME_FORMAT).to_string()),
                    ("end", to.format(QUERY_TIME_FORMAT).to_string()),
                ];
                let entries: Vec<HistoryEntry> =
                    self.get_json(item_tag, &format!("/bazaar/{item_tag}/history"), &query)?;
                Ok(entries.into_iter().map(HistoryEntry::into_raw).collect())
            }
            SeriesRange::Snapshot => Ok(vec![self.fetch_snapshot(item_tag)?.to_raw()]),
        }
    }

    fn fetch_snapshot(&self, item_tag: &str) -> Result<BazaarSnapshot, SkytraderError> {
        let response: SnapshotResponse =
            self.get_json(item_tag, &format!("/bazaar/{item_tag}/snapshot"), &[])?;
        response.into_snapshot(item_tag)
    }

    fn list_item_tags(&self) -> Result<Vec<String>, SkytraderError> {
        self.get_json("*", "/items/bazaar/tags", &[])
    }
}

impl AuctionDataPort for CoflnetAdapter {
    fn fetch_active_bins(&self, item_tag: &str) -> Result<Vec<AuctionListing>, SkytraderError> {
        let entries: Vec<AuctionEntry> =
            self.get_json(item_tag, &format!("/auctions/tag/{item_tag}/active/bin"), &[])?;
        Ok(to_listings(entries))
    }

    fn fetch_sold(&self, item_tag: &str) -> Result<Vec<AuctionListing>, SkytraderError> {
        let entries: Vec<AuctionEntry> =
            self.get_json(item_tag, &format!("/auctions/tag/{item_tag}/sold"), &[])?;
        Ok(to_listings(entries))
    }
}
