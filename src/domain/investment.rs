//! Sell checks for items already held.

use crate::domain::error::ItemListError;
use crate::domain::observation::BazaarSnapshot;
use crate::domain::tax::tax;

pub const DEFAULT_MIN_PROFIT: f64 = 10_000_000.0;
pub const DEFAULT_BAZAAR_MIN_PCT: f64 = 15.0;
pub const DEFAULT_AUCTION_MIN_PCT: f64 = 10.0;

/// A position bought earlier: `TAG:price` or `TAG:pricexqty`.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub item_tag: String,
    pub purchase_price: f64,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellThresholds {
    pub min_profit: f64,
    pub bazaar_min_pct: f64,
    pub auction_min_pct: f64,
}

impl Default for SellThresholds {
    fn default() -> Self {
        SellThresholds {
            min_profit: DEFAULT_MIN_PROFIT,
            bazaar_min_pct: DEFAULT_BAZAAR_MIN_PCT,
            auction_min_pct: DEFAULT_AUCTION_MIN_PCT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellCheck {
    pub holding: Holding,
    pub sell_price: f64,
    pub profit: f64,
    pub profit_pct: f64,
    pub worth_selling: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuctionCheck {
    Priced(SellCheck),
    NoListings { item_tag: String },
}

fn parse_holding(entry: &str) -> Result<Holding, ItemListError> {
    let invalid = |reason: &str| ItemListError::InvalidHolding {
        entry: entry.to_string(),
        reason: reason.to_string(),
    };

    let (tag, rest) = entry
        .split_once(':')
        .ok_or_else(|| invalid("expected TAG:price"))?;
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(invalid("empty item tag"));
    }

    let (price, quantity) = match rest.split_once(['x', 'X']) {
        Some((price, qty)) => {
            let qty: u64 = qty
                .trim()
                .parse()
                .map_err(|_| invalid("quantity is not a positive integer"))?;
            (price, qty)
        }
        None => (rest, 1),
    };
    if quantity == 0 {
        return Err(invalid("quantity must be at least 1"));
    }

    let purchase_price: f64 = price
        .trim()
        .parse()
        .map_err(|_| invalid("price is not a number"))?;
    if !purchase_price.is_finite() || purchase_price <= 0.0 {
        return Err(invalid("price must be positive"));
    }

    Ok(Holding {
        item_tag: tag.to_uppercase(),
        purchase_price,
        quantity,
    })
}

/// Parses a comma-separated holding list. A blank input is an empty list.
pub fn parse_holdings(input: &str) -> Result<Vec<Holding>, ItemListError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    input
        .split(',')
        .map(|token| {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                Err(ItemListError::EmptyToken)
            } else {
                parse_holding(trimmed)
            }
        })
        .collect()
}

/// Selling into the highest buy order, undercut by `fixed_spread`.
pub fn check_bazaar_holding(
    holding: &Holding,
    snapshot: &BazaarSnapshot,
    fixed_spread: f64,
    fee_factor: f64,
    thresholds: &SellThresholds,
) -> SellCheck {
    let qty = holding.quantity as f64;
    let sell_price = snapshot.buy_price - fixed_spread;
    let profit = fee_factor * sell_price * qty - holding.purchase_price * qty;
    let profit_pct = profit / holding.purchase_price * 100.0 / qty;

    SellCheck {
        holding: holding.clone(),
        sell_price,
        profit,
        profit_pct,
        worth_selling: profit >= thresholds.min_profit || profit_pct >= thresholds.bazaar_min_pct,
    }
}

/// Relisting at the cheapest active BIN, after auction tax.
pub fn check_auction_holding(
    holding: &Holding,
    active_bins: &[f64],
    thresholds: &SellThresholds,
) -> AuctionCheck {
    let lowest = active_bins
        .iter()
        .copied()
        .filter(|p| p.is_finite())
        .min_by(f64::total_cmp);

    let Some(lowest) = lowest else {
        return AuctionCheck::NoListings {
            item_tag: holding.item_tag.clone(),
        };
    };

    let profit = lowest - tax(lowest) - holding.purchase_price;
    let profit_pct = profit / holding.purchase_price * 100.0;

    AuctionCheck::Priced(SellCheck {
        holding: holding.clone(),
        sell_price: lowest,
        profit,
        profit_pct,
        worth_selling: profit_pct >= thresholds.auction_min_pct
            || profit >= thresholds.min_profit,
    })
}
