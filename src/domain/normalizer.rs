//! Price series normalization.
//!
//! Turns provider rows (any order, possibly incomplete, possibly newest-first)
//! into a time-ascending, deduplicated series annotated with rolling statistics.

use chrono::{Duration, NaiveDateTime};
use std::cmp::Ordering;
use tracing::debug;

use crate::domain::error::SkytraderError;
use crate::domain::observation::{PriceField, PriceObservation, RawObservation};
use crate::domain::rolling::{rolling_stats, RollingStats};
use crate::domain::signal::{Position, Signal};

pub const DEFAULT_SETTLE_HOURS: i64 = 24;
/// Upper bound on a settle period, about a century.
pub const MAX_SETTLE_HOURS: i64 = 24 * 36_500;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerConfig {
    pub window: usize,
    pub price_field: PriceField,
    /// Rows newer than `now - settle` are discarded when set.
    pub settle: Option<Duration>,
}

/// A cleaned observation with its statistics and strategy state.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedObservation {
    pub observation: PriceObservation,
    pub stats: Option<RollingStats>,
    pub target_price: Option<f64>,
    pub position: Position,
    pub signal: Signal,
}

impl AnnotatedObservation {
    pub fn new(observation: PriceObservation, stats: Option<RollingStats>) -> Self {
        Self {
            observation,
            stats,
            target_price: None,
            position: Position::Undefined,
            signal: Signal::None,
        }
    }
}

/// Drops incomplete rows, sorts ascending and collapses duplicate timestamps.
///
/// Among rows sharing a timestamp the lowest by field order is kept, so the
/// result does not depend on arrival order.
pub fn clean(raw: &[RawObservation]) -> Vec<PriceObservation> {
    let mut rows: Vec<PriceObservation> = raw.iter().filter_map(RawObservation::complete).collect();
    rows.sort_by(compare_rows);
    rows.dedup_by_key(|obs| obs.timestamp);
    rows
}

fn compare_rows(a: &PriceObservation, b: &PriceObservation) -> Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then(a.buy_price.total_cmp(&b.buy_price))
        .then(a.sell_price.total_cmp(&b.sell_price))
        .then(a.buy_volume.total_cmp(&b.buy_volume))
        .then(a.sell_volume.total_cmp(&b.sell_volume))
}

/// Discards rows newer than `now - settle`.
pub fn settle_filter(
    rows: Vec<PriceObservation>,
    now: NaiveDateTime,
    settle: Duration,
) -> Vec<PriceObservation> {
    let cutoff = now - settle;
    rows.into_iter().filter(|obs| obs.timestamp <= cutoff).collect()
}

/// Full normalization pipeline for one item.
///
/// Fails with `InsufficientData` when fewer than `window` complete rows survive,
/// since no row would carry a rolling mean.
pub fn normalize(
    item_tag: &str,
    raw: &[RawObservation],
    config: &NormalizerConfig,
    now: NaiveDateTime,
) -> Result<Vec<AnnotatedObservation>, SkytraderError> {
    let mut rows = clean(raw);
    let complete = rows.len();

    if let Some(settle) = config.settle {
        rows = settle_filter(rows, now, settle);
    }

    debug!(
        item = item_tag,
        fetched = raw.len(),
        complete,
        kept = rows.len(),
        "normalized series"
    );

    let minimum = config.window.max(1);
    if rows.len() < minimum {
        return Err(SkytraderError::InsufficientData {
            item_tag: item_tag.to_string(),
            rows: rows.len(),
            minimum,
        });
    }

    let values: Vec<f64> = rows.iter().map(|obs| obs.price(config.price_field)).collect();
    let stats = rolling_stats(&values, config.window);

    Ok(rows
        .into_iter()
        .zip(stats)
        .map(|(obs, stats)| AnnotatedObservation::new(obs, stats))
        .collect())
}
