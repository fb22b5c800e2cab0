//! Bazaar item screening by order depth, price level and spread.

use crate::domain::observation::BazaarSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningCriteria {
    pub min_orders: f64,
    pub min_mid_price: f64,
    /// Maximum half-spread as a fraction of the mid price.
    pub max_spread_ratio: f64,
}

impl Default for ScreeningCriteria {
    fn default() -> Self {
        ScreeningCriteria {
            min_orders: 150.0,
            min_mid_price: 50_000.0,
            max_spread_ratio: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenedItem {
    pub item_tag: String,
    pub mean_orders: f64,
    pub mid_price: f64,
    pub half_spread: f64,
}

/// Returns the screening figures when the snapshot passes, `None` otherwise.
/// Snapshots without both order counts never pass.
pub fn screen_snapshot(
    snapshot: &BazaarSnapshot,
    criteria: &ScreeningCriteria,
) -> Option<ScreenedItem> {
    let (buy_orders, sell_orders) = (snapshot.buy_orders?, snapshot.sell_orders?);

    let mean_orders = (buy_orders + sell_orders) as f64 / 2.0;
    let mid_price = (snapshot.buy_price + snapshot.sell_price) / 2.0;
    let half_spread = (snapshot.buy_price - snapshot.sell_price) / 2.0;

    let passes = mean_orders >= criteria.min_orders
        && mid_price >= criteria.min_mid_price
        && half_spread <= criteria.max_spread_ratio * mid_price;

    passes.then(|| ScreenedItem {
        item_tag: snapshot.item_tag.clone(),
        mean_orders,
        mid_price,
        half_spread,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(buy: f64, sell: f64, orders: Option<(u64, u64)>) -> BazaarSnapshot {
        BazaarSnapshot {
            item_tag: "RECOMBOBULATOR_3000".into(),
            timestamp: None,
            buy_price: buy,
            sell_price: sell,
            buy_volume: 0.0,
            sell_volume: 0.0,
            buy_orders: orders.map(|o| o.0),
            sell_orders: orders.map(|o| o.1),
        }
    }

    #[test]
    fn passes_all_criteria() {
        let item = screen_snapshot(
            &snapshot(6_000_000.0, 5_800_000.0, Some((200, 100))),
            &ScreeningCriteria::default(),
        )
        .unwrap();
        assert_eq!(item.mean_orders, 150.0);
        assert_eq!(item.mid_price, 5_900_000.0);
        assert_eq!(item.half_spread, 100_000.0);
    }

    #[test]
    fn too_few_orders() {
        assert!(screen_snapshot(
            &snapshot(6_000_000.0, 5_800_000.0, Some((100, 100))),
            &ScreeningCriteria::default()
        )
        .is_none());
    }

    #[test]
    fn too_cheap() {
        assert!(screen_snapshot(
            &snapshot(40_000.0, 39_000.0, Some((500, 500))),
            &ScreeningCriteria::default()
        )
        .is_none());
    }

    #[test]
    fn spread_too_wide() {
        // half spread 50k vs 20% of 75k mid = 15k
        assert!(screen_snapshot(
            &snapshot(125_000.0, 25_000.0, Some((500, 500))),
            &ScreeningCriteria::default()
        )
        .is_none());
    }

    #[test]
    fn missing_order_counts() {
        assert!(screen_snapshot(
            &snapshot(6_000_000.0, 5_800_000.0, None),
            &ScreeningCriteria::default()
        )
        .is_none());
    }
}
