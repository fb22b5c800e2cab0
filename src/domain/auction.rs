//! Auction house benchmarks and underpriced listing detection.
//!
//! benchmark     = median + 0.5 * stddev of settled sold starting bids
//! buy_threshold = benchmark - (discount * benchmark + tax(benchmark))
//! A listing is a gap when price <= buy_threshold, or when the absolute
//! margin benchmark - price reaches `min_margin`.

use chrono::{Duration, NaiveDateTime};

use crate::domain::error::SkytraderError;
use crate::domain::rolling::{median, sample_std_dev};
use crate::domain::tax::tax;

#[derive(Debug, Clone, PartialEq)]
pub struct AuctionListing {
    pub item_name: Option<String>,
    pub starting_bid: f64,
    pub start: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GapThresholds {
    pub discount: f64,
    pub min_margin: f64,
    pub std_dev_weight: f64,
}

impl Default for GapThresholds {
    fn default() -> Self {
        GapThresholds {
            discount: 0.15,
            min_margin: 19_999_999.0,
            std_dev_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceGap {
    pub price: f64,
    /// benchmark - price - tax(price)
    pub margin: f64,
    pub discount_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceGapReport {
    pub item_tag: String,
    pub item_name: Option<String>,
    pub median: f64,
    pub std_dev: f64,
    pub benchmark: f64,
    pub buy_threshold: f64,
    pub gaps: Vec<PriceGap>,
}

/// Listings started at or before `now - settle`. Listings without a start time
/// are kept.
pub fn settled_listings(
    listings: &[AuctionListing],
    now: NaiveDateTime,
    settle: Duration,
) -> Vec<&AuctionListing> {
    let cutoff = now - settle;
    listings
        .iter()
        .filter(|l| l.start.is_none_or(|start| start <= cutoff))
        .collect()
}

pub fn find_price_gaps(
    item_tag: &str,
    sold: &[AuctionListing],
    active: &[AuctionListing],
    thresholds: &GapThresholds,
    now: NaiveDateTime,
    settle: Duration,
) -> Result<PriceGapReport, SkytraderError> {
    let settled = settled_listings(sold, now, settle);
    let bids: Vec<f64> = settled
        .iter()
        .map(|l| l.starting_bid)
        .filter(|b| b.is_finite())
        .collect();

    let insufficient = || SkytraderError::InsufficientData {
        item_tag: item_tag.to_string(),
        rows: bids.len(),
        minimum: 2,
    };
    let median = median(&bids).ok_or_else(insufficient)?;
    let std_dev = sample_std_dev(&bids).ok_or_else(insufficient)?;

    let benchmark = median + thresholds.std_dev_weight * std_dev;
    let buy_threshold = benchmark - (thresholds.discount * benchmark + tax(benchmark));

    let gaps = active
        .iter()
        .map(|l| l.starting_bid)
        .filter(|&price| price <= buy_threshold || benchmark - price >= thresholds.min_margin)
        .map(|price| {
            let margin = benchmark - price - tax(price);
            PriceGap {
                price,
                margin,
                discount_pct: if benchmark > 0.0 {
                    margin / benchmark * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect();

    let item_name = sold
        .iter()
        .chain(active.iter())
        .find_map(|l| l.item_name.clone());

    Ok(PriceGapReport {
        item_tag: item_tag.to_string(),
        item_name,
        median,
        std_dev,
        benchmark,
        buy_threshold,
        gaps,
    })
}
