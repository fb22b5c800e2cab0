//! Property tests for normalization and the backtest engine.

mod common;

use chrono::Duration;
use common::*;
use proptest::prelude::*;
use skytrader::domain::backtest::{evaluate_item, simulate_trades};
use skytrader::domain::normalizer::clean;
use skytrader::domain::observation::RawObservation;
use skytrader::domain::results::{ItemResult, Roi};
use skytrader::domain::rolling::rolling_stats;
use skytrader::domain::strategy::{Strategy as TradingStrategy, StrategyMode};

fn row(hour: u32, buy: f64, sell: f64) -> RawObservation {
    RawObservation {
        timestamp: Some(ts(1) + Duration::hours(hour as i64)),
        buy_price: Some(buy),
        sell_price: Some(sell),
        buy_volume: Some(3000.0),
        sell_volume: Some(5000.0),
    }
}

fn rows_strategy() -> impl Strategy<Value = Vec<RawObservation>> {
    prop::collection::vec((0u32..200, 1.0f64..1000.0, 1.0f64..1000.0), 1..60)
        .prop_map(|v| v.into_iter().map(|(h, b, s)| row(h, b, s)).collect())
}

fn evaluate(rows: &[RawObservation], strategy: &TradingStrategy) -> Option<ItemResult> {
    evaluate_item("X", rows, strategy, &default_config(), now())
        .ok()
        .map(|e| e.result)
}

fn strategies() -> Vec<TradingStrategy> {
    vec![
        passthrough_strategy(),
        three_state_strategy(),
        TradingStrategy::from_mode(StrategyMode::Weekly),
        TradingStrategy::from_mode(StrategyMode::Monthly),
    ]
}

proptest! {
    #[test]
    fn rolling_stats_depend_only_on_trailing_window(
        prefix in prop::collection::vec(1.0f64..1000.0, 0..20),
        values in prop::collection::vec(1.0f64..1000.0, 1..40),
        window in 1usize..10,
    ) {
        let mut shifted = prefix.clone();
        shifted.extend_from_slice(&values);

        let plain = rolling_stats(&values, window);
        let offset = rolling_stats(&shifted, window);
        for (i, stats) in plain.iter().enumerate() {
            if i + 1 >= window {
                prop_assert_eq!(*stats, offset[prefix.len() + i]);
            } else {
                prop_assert!(stats.is_none());
            }
        }
    }

    #[test]
    fn backtest_is_repeatable(rows in rows_strategy()) {
        for strategy in strategies() {
            if let Ok(eval) = evaluate_item("X", &rows, &strategy, &default_config(), now()) {
                let first = simulate_trades(&eval.series, &default_config());
                let second = simulate_trades(&eval.series, &default_config());
                prop_assert_eq!(&first, &second);
                prop_assert_eq!(&first, &eval.result.trades);
            }
        }
    }

    #[test]
    fn result_does_not_depend_on_arrival_order(
        (rows, shuffled) in rows_strategy().prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        for strategy in strategies() {
            prop_assert_eq!(evaluate(&rows, &strategy), evaluate(&shuffled, &strategy));
        }
    }

    #[test]
    fn shifting_time_does_not_change_trades(rows in rows_strategy(), days in 1i64..365) {
        let shifted: Vec<RawObservation> = rows
            .iter()
            .map(|r| RawObservation {
                timestamp: r.timestamp.map(|t| t + Duration::days(days)),
                ..r.clone()
            })
            .collect();

        let summary = |result: Option<ItemResult>| {
            result.map(|r| {
                r.trades
                    .iter()
                    .map(|t| (t.quantity, t.entry_price, t.exit_price, t.profit))
                    .collect::<Vec<_>>()
            })
        };
        for strategy in strategies() {
            prop_assert_eq!(
                summary(evaluate(&rows, &strategy)),
                summary(evaluate(&shifted, &strategy))
            );
        }
    }

    #[test]
    fn cleaning_is_idempotent(rows in rows_strategy()) {
        let once = clean(&rows);
        let again: Vec<RawObservation> = once.iter().cloned().map(RawObservation::from).collect();
        prop_assert_eq!(clean(&again), once.clone());
        prop_assert!(once.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn no_cheap_rows_means_no_trades(
        prices in prop::collection::vec((0u32..200, 1.0f64..1000.0, 0.0f64..500.0), 1..60)
    ) {
        // sell >= buy everywhere, so the buy-price target never covers sell + spread.
        let rows: Vec<RawObservation> = prices
            .into_iter()
            .map(|(h, buy, extra)| row(h, buy, buy + extra))
            .collect();
        let result = evaluate(&rows, &passthrough_strategy()).unwrap();
        prop_assert!(result.trades.is_empty());
        prop_assert_eq!(result.roi, Roi::NoQualifyingTrades);
    }

    #[test]
    fn totals_cover_closed_trades_only(rows in rows_strategy()) {
        if let Some(result) = evaluate(&rows, &passthrough_strategy()) {
            let closed: Vec<_> = result.closed_trades().collect();
            let profit: f64 = closed.iter().map(|t| t.profit).sum();
            let invested: f64 = closed.iter().map(|t| t.invested).sum();
            prop_assert!((result.total_profit - profit).abs() < 1e-6);
            prop_assert!((result.total_invested - invested).abs() < 1e-6);
            prop_assert!(result.open_trades().all(|t| t.profit == 0.0));
            prop_assert!(result.trades.iter().all(|t| t.quantity >= 1));
        }
    }
}

#[test]
fn strategy_presets_are_distinct() {
    let weekly = TradingStrategy::from_mode(StrategyMode::Weekly);
    let monthly = TradingStrategy::from_mode(StrategyMode::Monthly);
    assert_ne!(weekly, monthly);
}
