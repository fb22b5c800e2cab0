//! Per-item and cross-item profit aggregation.

use crate::domain::backtest::Trade;

/// Return on investment, guarded against an empty denominator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Roi {
    Percent(f64),
    NoQualifyingTrades,
}

impl Roi {
    /// profit / invested * 100, or `NoQualifyingTrades` when nothing was invested.
    pub fn compute(total_profit: f64, total_invested: f64) -> Self {
        if total_invested == 0.0 {
            Roi::NoQualifyingTrades
        } else {
            Roi::Percent(total_profit / total_invested * 100.0)
        }
    }

    pub fn percent(self) -> Option<f64> {
        match self {
            Roi::Percent(p) => Some(p),
            Roi::NoQualifyingTrades => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemResult {
    pub item_tag: String,
    pub trades: Vec<Trade>,
    pub total_profit: f64,
    pub total_invested: f64,
    pub roi: Roi,
}

impl ItemResult {
    /// Totals cover closed trades only; open trades are reported but not realized.
    pub fn from_trades(item_tag: &str, trades: Vec<Trade>) -> Self {
        let (total_profit, total_invested) = trades
            .iter()
            .filter(|t| !t.is_open())
            .fold((0.0, 0.0), |(p, i), t| (p + t.profit, i + t.invested));

        ItemResult {
            item_tag: item_tag.to_string(),
            trades,
            total_profit,
            total_invested,
            roi: Roi::compute(total_profit, total_invested),
        }
    }

    pub fn closed_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| !t.is_open())
    }

    pub fn open_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.is_open())
    }
}

/// Totals summed across items with one ROI computed from the sums.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub items: usize,
    pub total_profit: f64,
    pub total_invested: f64,
    pub roi: Roi,
}

impl PortfolioSummary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ItemResult>) -> Self {
        let mut items = 0usize;
        let mut total_profit = 0.0_f64;
        let mut total_invested = 0.0_f64;

        for result in results {
            items += 1;
            total_profit += result.total_profit;
            total_invested += result.total_invested;
        }

        PortfolioSummary {
            items,
            total_profit,
            total_invested,
            roi: Roi::compute(total_profit, total_invested),
        }
    }
}
