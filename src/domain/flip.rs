//! Bazaar flip assessment: is the current buy order cheap relative to the
//! past month, and has the item actually traded high enough to profit?

use std::fmt;

use crate::domain::error::SkytraderError;
use crate::domain::observation::{BazaarSnapshot, PriceObservation};
use crate::domain::rolling::{mean, sample_std_dev};

pub const PROFIT_MARGIN: f64 = 1.15;
pub const LOW_BENCHMARK_STD_WEIGHT: f64 = 0.25;
/// At most this many periods above the profit threshold counts as a spike.
pub const SPIKE_PERIODS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipVerdict {
    AboveAverage,
    NeverProfitable,
    SpikeOnly,
    DeepDiscount,
    Candidate,
}

impl fmt::Display for FlipVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FlipVerdict::AboveAverage => "above the monthly average, not worth buying",
            FlipVerdict::NeverProfitable => "never reached a 15% margin, not worth buying",
            FlipVerdict::SpikeOnly => "only reached a 15% margin in spikes, probably not worth buying",
            FlipVerdict::DeepDiscount => "far below its usual range, possible opportunity",
            FlipVerdict::Candidate => "below average with a history of profitable exits",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlipAssessment {
    pub item_tag: String,
    pub mean: f64,
    pub std_dev: f64,
    pub benchmark_high: f64,
    pub benchmark_low: f64,
    pub buy_order: f64,
    pub profit_threshold: f64,
    pub periods_above: usize,
    /// (mean - buy_order) / mean * 100
    pub pct_below_mean: f64,
    pub verdict: FlipVerdict,
}

/// Statistics are taken over sell prices of `history`, which the caller has
/// already cleaned and settle-filtered.
pub fn assess_flip(
    item_tag: &str,
    history: &[PriceObservation],
    snapshot: &BazaarSnapshot,
    fixed_spread: f64,
) -> Result<FlipAssessment, SkytraderError> {
    let sells: Vec<f64> = history.iter().map(|o| o.sell_price).collect();
    let insufficient = || SkytraderError::InsufficientData {
        item_tag: item_tag.to_string(),
        rows: sells.len(),
        minimum: 2,
    };
    let mean = mean(&sells).ok_or_else(insufficient)?;
    let std_dev = sample_std_dev(&sells).ok_or_else(insufficient)?;
    let max = sells.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = sells.iter().copied().fold(f64::INFINITY, f64::min);

    let benchmark_high = max - std_dev;
    let benchmark_low = min + LOW_BENCHMARK_STD_WEIGHT * std_dev;
    let buy_order = snapshot.sell_price + fixed_spread;
    let profit_threshold = PROFIT_MARGIN * buy_order;
    let periods_above = history
        .iter()
        .filter(|o| o.buy_price >= profit_threshold)
        .count();

    let verdict = if buy_order > mean {
        FlipVerdict::AboveAverage
    } else if periods_above == 0 {
        FlipVerdict::NeverProfitable
    } else if periods_above <= SPIKE_PERIODS && profit_threshold >= benchmark_high {
        FlipVerdict::SpikeOnly
    } else if buy_order <= benchmark_low {
        FlipVerdict::DeepDiscount
    } else {
        FlipVerdict::Candidate
    };

    Ok(FlipAssessment {
        item_tag: item_tag.to_string(),
        mean,
        std_dev,
        benchmark_high,
        benchmark_low,
        buy_order,
        profit_threshold,
        periods_above,
        pct_below_mean: if mean != 0.0 {
            (mean - buy_order) / mean * 100.0
        } else {
            0.0
        },
        verdict,
    })
}
