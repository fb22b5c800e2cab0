//! Strategy configuration: position policy plus normalization parameters.

use chrono::Duration;
use std::str::FromStr;

use crate::domain::normalizer::{NormalizerConfig, MAX_SETTLE_HOURS};
use crate::domain::observation::PriceField;
use crate::domain::policy::PositionPolicy;

pub const DEFAULT_ALPHA: f64 = 0.9;
pub const DEFAULT_BETA: f64 = 0.5;
pub const DEFAULT_GAMMA: f64 = 1.2;

/// Named parameter sets of the reference strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyMode {
    /// 7-sample window, binary policy.
    Weekly,
    /// 30-sample window, three-state policy.
    Monthly,
}

impl StrategyMode {
    pub fn window(self) -> usize {
        match self {
            StrategyMode::Weekly => 7,
            StrategyMode::Monthly => 30,
        }
    }

    pub fn policy(self) -> PositionPolicy {
        match self {
            StrategyMode::Weekly => PositionPolicy::Binary {
                alpha: DEFAULT_ALPHA,
                beta: DEFAULT_BETA,
            },
            StrategyMode::Monthly => PositionPolicy::ThreeState {
                alpha: DEFAULT_ALPHA,
                gamma: DEFAULT_GAMMA,
            },
        }
    }
}

impl FromStr for StrategyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(StrategyMode::Weekly),
            "monthly" => Ok(StrategyMode::Monthly),
            other => Err(format!("unknown mode '{other}', expected weekly or monthly")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub policy: PositionPolicy,
    pub window: usize,
    pub price_field: PriceField,
    pub settle_hours: Option<i64>,
}

impl Strategy {
    pub fn from_mode(mode: StrategyMode) -> Self {
        let name = match mode {
            StrategyMode::Weekly => "weekly",
            StrategyMode::Monthly => "monthly",
        };
        Strategy {
            name: name.to_string(),
            policy: mode.policy(),
            window: mode.window(),
            price_field: PriceField::Buy,
            settle_hours: None,
        }
    }

    pub fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig {
            window: self.window,
            price_field: self.price_field,
            settle: self
                .settle_hours
                .filter(|h| *h > 0)
                .map(|h| Duration::hours(h.min(MAX_SETTLE_HOURS))),
        }
    }
}
