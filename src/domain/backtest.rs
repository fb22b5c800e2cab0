//! Signal-driven backtest engine.
//!
//! Trades are simulated in a single pass over an annotated series: each Enter
//! signal opens a trade at `sell + spread`, and an Exit signal closes it at the
//! buy price net of the sale fee. How Enters are paired with Exits is set by
//! [`MatchingMode`].

use chrono::NaiveDateTime;
use std::collections::VecDeque;
use std::str::FromStr;
use tracing::debug;

use crate::domain::error::SkytraderError;
use crate::domain::normalizer::{normalize, AnnotatedObservation};
use crate::domain::observation::{PriceObservation, RawObservation};
use crate::domain::policy::apply_policy;
use crate::domain::results::ItemResult;
use crate::domain::signal::Signal;
use crate::domain::strategy::Strategy;
use crate::domain::tax::tax;

pub const DEFAULT_FIXED_SPREAD: f64 = 0.1;
pub const DEFAULT_LOT_SIZE: f64 = 2000.0;
pub const DEFAULT_FEE_FACTOR: f64 = 0.98875;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchingMode {
    /// Every Enter closes at the first Exit after it; Exits are shared.
    #[default]
    EveryEntry,
    /// Each Exit closes the oldest open Enter only.
    Fifo,
}

impl FromStr for MatchingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "every_entry" => Ok(MatchingMode::EveryEntry),
            "fifo" => Ok(MatchingMode::Fifo),
            other => Err(format!(
                "unknown matching mode '{other}', expected every_entry or fifo"
            )),
        }
    }
}

/// Fee deducted from the exit price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SaleFee {
    /// exit = factor * buy - spread
    Factor(f64),
    /// exit = buy - tax(buy) - spread
    AuctionTax,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub fixed_spread: f64,
    pub lot_size: f64,
    pub sale_fee: SaleFee,
    pub matching: MatchingMode,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            fixed_spread: DEFAULT_FIXED_SPREAD,
            lot_size: DEFAULT_LOT_SIZE,
            sale_fee: SaleFee::Factor(DEFAULT_FEE_FACTOR),
            matching: MatchingMode::EveryEntry,
        }
    }
}

impl BacktestConfig {
    pub fn entry_price(&self, obs: &PriceObservation) -> f64 {
        obs.sell_price + self.fixed_spread
    }

    pub fn exit_price(&self, obs: &PriceObservation) -> f64 {
        match self.sale_fee {
            SaleFee::Factor(factor) => factor * obs.buy_price - self.fixed_spread,
            SaleFee::AuctionTax => obs.buy_price - tax(obs.buy_price) - self.fixed_spread,
        }
    }

    /// floor(mean volume / lot size), at least one unit.
    pub fn quantity(&self, obs: &PriceObservation) -> u64 {
        let lots = (obs.mean_volume() / self.lot_size).floor();
        if lots.is_finite() && lots >= 1.0 {
            lots as u64
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: Option<NaiveDateTime>,
    pub exit_price: Option<f64>,
    pub quantity: u64,
    /// Zero while the trade is open.
    pub profit: f64,
    /// quantity * entry_price
    pub invested: f64,
}

impl Trade {
    fn open(obs: &PriceObservation, config: &BacktestConfig) -> Self {
        let quantity = config.quantity(obs);
        let entry_price = config.entry_price(obs);
        Trade {
            entry_time: obs.timestamp,
            entry_price,
            exit_time: None,
            exit_price: None,
            quantity,
            profit: 0.0,
            invested: quantity as f64 * entry_price,
        }
    }

    fn close(&mut self, obs: &PriceObservation, config: &BacktestConfig) {
        let exit_price = config.exit_price(obs);
        self.exit_time = Some(obs.timestamp);
        self.exit_price = Some(exit_price);
        self.profit = self.quantity as f64 * (exit_price - self.entry_price);
    }

    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }
}

/// Simulates trades from the signals on `rows`, in entry order.
pub fn simulate_trades(rows: &[AnnotatedObservation], config: &BacktestConfig) -> Vec<Trade> {
    match config.matching {
        MatchingMode::EveryEntry => match_every_entry(rows, config),
        MatchingMode::Fifo => match_fifo(rows, config),
    }
}

fn match_every_entry(rows: &[AnnotatedObservation], config: &BacktestConfig) -> Vec<Trade> {
    let exits: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.signal == Signal::Exit)
        .map(|(i, _)| i)
        .collect();

    rows.iter()
        .enumerate()
        .filter(|(_, r)| r.signal == Signal::Enter)
        .map(|(i, row)| {
            let mut trade = Trade::open(&row.observation, config);
            let next = exits.partition_point(|&j| j <= i);
            if let Some(&j) = exits.get(next) {
                trade.close(&rows[j].observation, config);
            }
            trade
        })
        .collect()
}

fn match_fifo(rows: &[AnnotatedObservation], config: &BacktestConfig) -> Vec<Trade> {
    let mut trades: Vec<Trade> = Vec::new();
    let mut open: VecDeque<usize> = VecDeque::new();

    for row in rows {
        match row.signal {
            Signal::Enter => {
                open.push_back(trades.len());
                trades.push(Trade::open(&row.observation, config));
            }
            Signal::Exit => {
                if let Some(slot) = open.pop_front() {
                    trades[slot].close(&row.observation, config);
                }
            }
            Signal::None => {}
        }
    }

    trades
}

/// Backtests an annotated series whose policy has already been applied.
pub fn run_backtest(
    item_tag: &str,
    rows: &[AnnotatedObservation],
    config: &BacktestConfig,
) -> ItemResult {
    let trades = simulate_trades(rows, config);
    debug!(item = item_tag, trades = trades.len(), "simulated trades");
    ItemResult::from_trades(item_tag, trades)
}

/// Annotated series plus backtest result for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemEvaluation {
    pub series: Vec<AnnotatedObservation>,
    pub result: ItemResult,
}

impl ItemEvaluation {
    /// Most recent row; the current target price and position.
    pub fn latest(&self) -> Option<&AnnotatedObservation> {
        self.series.last()
    }
}

/// Normalize → apply policy → backtest for one item's raw observations.
pub fn evaluate_item(
    item_tag: &str,
    raw: &[RawObservation],
    strategy: &Strategy,
    config: &BacktestConfig,
    now: NaiveDateTime,
) -> Result<ItemEvaluation, SkytraderError> {
    let mut series = normalize(item_tag, raw, &strategy.normalizer_config(), now)?;
    apply_policy(&mut series, &strategy.policy, config.fixed_spread);
    let result = run_backtest(item_tag, &series, config);
    Ok(ItemEvaluation { series, result })
}
