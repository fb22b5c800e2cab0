//! Multi-item backtest runs.
//!
//! Parses item lists from configuration and backtests each item independently.
//! An item whose data cannot be fetched, is too short or fails to evaluate is
//! skipped with a reason; the rest of the batch proceeds.

use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::domain::backtest::{evaluate_item, BacktestConfig};
use crate::domain::error::{ItemListError, SkytraderError};
use crate::domain::results::{ItemResult, PortfolioSummary};
use crate::domain::strategy::Strategy;
use crate::ports::market_data_port::{MarketDataPort, SeriesRange};

pub fn parse_item_tags(input: &str) -> Result<Vec<String>, ItemListError> {
    let mut tags = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(ItemListError::EmptyToken);
        }
        let tag = trimmed.to_uppercase();
        if !seen.insert(tag.clone()) {
            return Err(ItemListError::DuplicateItem(tag));
        }
        tags.push(tag);
    }

    Ok(tags)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Fetch(String),
    InsufficientData { rows: usize, minimum: usize },
    /// The series was fetched but could not be backtested.
    Evaluation(String),
}

impl SkipReason {
    fn from_evaluation_error(e: &SkytraderError) -> Self {
        match e {
            SkytraderError::InsufficientData { rows, minimum, .. } => SkipReason::InsufficientData {
                rows: *rows,
                minimum: *minimum,
            },
            other => SkipReason::Evaluation(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Completed(ItemResult),
    Skipped { item_tag: String, reason: SkipReason },
}

impl ItemOutcome {
    pub fn item_tag(&self) -> &str {
        match self {
            ItemOutcome::Completed(result) => &result.item_tag,
            ItemOutcome::Skipped { item_tag, .. } => item_tag,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
    pub summary: PortfolioSummary,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: Vec<ItemOutcome>) -> Self {
        let summary = PortfolioSummary::from_results(outcomes.iter().filter_map(|o| match o {
            ItemOutcome::Completed(result) => Some(result),
            ItemOutcome::Skipped { .. } => None,
        }));
        BatchReport { outcomes, summary }
    }

    pub fn completed(&self) -> impl Iterator<Item = &ItemResult> {
        self.outcomes.iter().filter_map(|o| match o {
            ItemOutcome::Completed(result) => Some(result),
            ItemOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.outcomes.iter().filter_map(|o| match o {
            ItemOutcome::Skipped { item_tag, reason } => Some((item_tag.as_str(), reason)),
            ItemOutcome::Completed(_) => None,
        })
    }
}

/// Fetches and backtests one item, folding recoverable failures into a skip.
pub fn run_item(
    data_port: &dyn MarketDataPort,
    item_tag: &str,
    range: &SeriesRange,
    strategy: &Strategy,
    config: &BacktestConfig,
    now: NaiveDateTime,
) -> ItemOutcome {
    let raw = match data_port.fetch_series(item_tag, range) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(item = item_tag, error = %e, "skipping item");
            return ItemOutcome::Skipped {
                item_tag: item_tag.to_string(),
                reason: SkipReason::Fetch(e.to_string()),
            };
        }
    };

    match evaluate_item(item_tag, &raw, strategy, config, now) {
        Ok(evaluation) => {
            info!(
                item = item_tag,
                rows = evaluation.series.len(),
                trades = evaluation.result.trades.len(),
                "backtested"
            );
            ItemOutcome::Completed(evaluation.result)
        }
        Err(e) => {
            warn!(item = item_tag, error = %e, "skipping item");
            ItemOutcome::Skipped {
                item_tag: item_tag.to_string(),
                reason: SkipReason::from_evaluation_error(&e),
            }
        }
    }
}

/// Backtests every item in order. Per-item failures never abort the batch.
pub fn run_batch(
    data_port: &dyn MarketDataPort,
    item_tags: &[String],
    range: &SeriesRange,
    strategy: &Strategy,
    config: &BacktestConfig,
    now: NaiveDateTime,
) -> BatchReport {
    let outcomes: Vec<ItemOutcome> = item_tags
        .iter()
        .map(|tag| run_item(data_port, tag, range, strategy, config, now))
        .collect();

    let report = BatchReport::from_outcomes(outcomes);
    info!(
        completed = report.summary.items,
        skipped = report.skipped().count(),
        total = item_tags.len(),
        "backtested {} of {} items",
        report.summary.items,
        item_tags.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_item_tags_basic() {
        let result = parse_item_tags("DRAGON_HORN,DRAGON_CLAW,WITHER_BLOOD").unwrap();
        assert_eq!(result, vec!["DRAGON_HORN", "DRAGON_CLAW", "WITHER_BLOOD"]);
    }

    #[test]
    fn parse_item_tags_with_whitespace_and_case() {
        let result = parse_item_tags("  dragon_horn , Spirit_Bone ").unwrap();
        assert_eq!(result, vec!["DRAGON_HORN", "SPIRIT_BONE"]);
    }

    #[test]
    fn parse_item_tags_empty_token() {
        let result = parse_item_tags("A,,B");
        assert_eq!(result, Err(ItemListError::EmptyToken));
    }

    #[test]
    fn parse_item_tags_duplicate() {
        let result = parse_item_tags("A,B,a");
        assert_eq!(result, Err(ItemListError::DuplicateItem("A".into())));
    }

    #[test]
    fn outcome_item_tag() {
        let skipped = ItemOutcome::Skipped {
            item_tag: "X".into(),
            reason: SkipReason::Fetch("boom".into()),
        };
        assert_eq!(skipped.item_tag(), "X");
    }

    #[test]
    fn evaluation_errors_keep_their_kind() {
        let short = SkytraderError::InsufficientData {
            item_tag: "X".into(),
            rows: 2,
            minimum: 7,
        };
        assert_eq!(
            SkipReason::from_evaluation_error(&short),
            SkipReason::InsufficientData { rows: 2, minimum: 7 }
        );

        let invalid = SkytraderError::invalid("strategy", "window", "window must be at least 1");
        let reason = SkipReason::from_evaluation_error(&invalid);
        assert!(matches!(&reason, SkipReason::Evaluation(msg) if msg.contains("window")));
        assert!(!matches!(reason, SkipReason::Fetch(_)));
    }

    #[test]
    fn report_without_completed_items() {
        let report = BatchReport::from_outcomes(vec![ItemOutcome::Skipped {
            item_tag: "X".into(),
            reason: SkipReason::InsufficientData { rows: 2, minimum: 7 },
        }]);
        assert_eq!(report.completed().count(), 0);
        assert_eq!(report.skipped().count(), 1);
        assert_eq!(report.summary.items, 0);
    }
}
