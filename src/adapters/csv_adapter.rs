//! CSV file data adapter for offline price history.
//!
//! One file per item, `<dir>/<TAG>.csv`, with header
//! `timestamp,buy,sell,buy_volume,sell_volume` and optional trailing
//! `buy_orders,sell_orders` columns. Empty cells are missing values.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::SkytraderError;
use crate::domain::observation::{parse_timestamp, BazaarSnapshot, RawObservation};
use crate::ports::market_data_port::{MarketDataPort, SeriesRange};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: Option<String>,
    buy: Option<f64>,
    sell: Option<f64>,
    buy_volume: Option<f64>,
    sell_volume: Option<f64>,
    #[serde(default)]
    buy_orders: Option<u64>,
    #[serde(default)]
    sell_orders: Option<u64>,
}

impl CsvRow {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }

    fn to_raw(&self) -> RawObservation {
        RawObservation {
            timestamp: self.timestamp(),
            buy_price: self.buy,
            sell_price: self.sell,
            buy_volume: self.buy_volume,
            sell_volume: self.sell_volume,
        }
    }
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, item_tag: &str) -> PathBuf {
        self.base_path.join(format!("{item_tag}.csv"))
    }

    fn read_rows(&self, item_tag: &str) -> Result<Vec<CsvRow>, SkytraderError> {
        let path = self.csv_path(item_tag);
        let content = fs::read_to_string(&path).map_err(|e| {
            SkytraderError::fetch(item_tag, format!("failed to read {}: {e}", path.display()))
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        rdr.deserialize()
            .collect::<Result<Vec<CsvRow>, _>>()
            .map_err(|e| SkytraderError::fetch(item_tag, format!("CSV parse error: {e}")))
    }
}

impl MarketDataPort for CsvAdapter {
    fn fetch_series(
        &self,
        item_tag: &str,
        range: &SeriesRange,
    ) -> Result<Vec<RawObservation>, SkytraderError> {
        match range {
            SeriesRange::Between { from, to } => Ok(self
                .read_rows(item_tag)?
                .iter()
                .map(CsvRow::to_raw)
                .filter(|raw| match raw.timestamp {
                    Some(ts) => ts >= *from && ts <= *to,
                    // left for the normalizer to drop
                    None => true,
                })
                .collect()),
            SeriesRange::Snapshot => Ok(vec![self.fetch_snapshot(item_tag)?.to_raw()]),
        }
    }

    fn fetch_snapshot(&self, item_tag: &str) -> Result<BazaarSnapshot, SkytraderError> {
        let rows = self.read_rows(item_tag)?;
        let latest = rows
            .iter()
            .filter_map(|row| {
                let complete = row.to_raw().complete()?;
                Some((complete, row))
            })
            .max_by_key(|(obs, _)| obs.timestamp)
            .ok_or_else(|| SkytraderError::fetch(item_tag, "no complete rows"))?;

        let (obs, row) = latest;
        Ok(BazaarSnapshot {
            item_tag: item_tag.to_string(),
            timestamp: Some(obs.timestamp),
            buy_price: obs.buy_price,
            sell_price: obs.sell_price,
            buy_volume: obs.buy_volume,
            sell_volume: obs.sell_volume,
            buy_orders: row.buy_orders,
            sell_orders: row.sell_orders,
        })
    }

    fn list_item_tags(&self) -> Result<Vec<String>, SkytraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            SkytraderError::fetch(
                "*",
                format!("failed to read directory {}: {e}", self.base_path.display()),
            )
        })?;

        let mut tags = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SkytraderError::fetch("*", e))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    tags.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        tags.sort();
        Ok(tags)
    }
}
