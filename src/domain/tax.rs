//! Auction house fee schedule.
//!
//! Listing fee by price tier plus a flat claim fee:
//! - price < 10,000,000            → 1%
//! - price ≤ 99,999,999            → 2%
//! - otherwise                     → 2.5%
//! - claim fee on every sale       → 1%

pub const LOW_TIER_CEILING: f64 = 10_000_000.0;
pub const MID_TIER_CEILING: f64 = 99_999_999.0;
pub const CLAIM_FEE_RATE: f64 = 0.01;

pub fn listing_fee_rate(price: f64) -> f64 {
    if price < LOW_TIER_CEILING {
        0.01
    } else if price <= MID_TIER_CEILING {
        0.02
    } else {
        0.025
    }
}

/// Total fees paid when selling at `price`.
pub fn tax(price: f64) -> f64 {
    price * listing_fee_rate(price) + price * CLAIM_FEE_RATE
}
