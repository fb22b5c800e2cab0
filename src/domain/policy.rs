//! Position policies: target price and position classification per row.

use crate::domain::normalizer::AnnotatedObservation;
use crate::domain::rolling::RollingStats;
use crate::domain::signal::{derive_signals, Position};

/// How a target price is derived and compared against the entry cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionPolicy {
    /// target = alpha * (mean + beta * std_dev); Long or Flat.
    Binary { alpha: f64, beta: f64 },
    /// target = alpha * mean; Long, Flat, or Undefined in the dead band.
    ThreeState { alpha: f64, gamma: f64 },
}

impl PositionPolicy {
    pub fn target_price(&self, stats: &RollingStats) -> f64 {
        match *self {
            PositionPolicy::Binary { alpha, beta } => alpha * (stats.mean + beta * stats.std_dev),
            PositionPolicy::ThreeState { alpha, .. } => alpha * stats.mean,
        }
    }

    /// Classifies a row given its target and the cost of posting a buy order
    /// (`sell_price + spread`). Both thresholds are inclusive; Long wins ties.
    pub fn classify(&self, target: f64, sell_price: f64, spread: f64) -> Position {
        let cost = sell_price + spread;
        match *self {
            PositionPolicy::Binary { .. } => {
                if target >= cost {
                    Position::Long
                } else {
                    Position::Flat
                }
            }
            PositionPolicy::ThreeState { gamma, .. } => {
                if target >= cost {
                    Position::Long
                } else if gamma * target <= cost {
                    Position::Flat
                } else {
                    Position::Undefined
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PositionPolicy::Binary { .. } => "binary",
            PositionPolicy::ThreeState { .. } => "three_state",
        }
    }
}

/// Fills target price, position and signal on every row. Rows without
/// statistics stay Undefined and never produce a signal.
pub fn apply_policy(rows: &mut [AnnotatedObservation], policy: &PositionPolicy, spread: f64) {
    for row in rows.iter_mut() {
        match row.stats {
            Some(stats) => {
                let target = policy.target_price(&stats);
                row.target_price = Some(target);
                row.position = policy.classify(target, row.observation.sell_price, spread);
            }
            None => {
                row.target_price = None;
                row.position = Position::Undefined;
            }
        }
    }

    let positions: Vec<Position> = rows.iter().map(|r| r.position).collect();
    for (row, signal) in rows.iter_mut().zip(derive_signals(&positions)) {
        row.signal = signal;
    }
}
