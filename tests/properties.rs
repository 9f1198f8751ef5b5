use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::HashMap;

use stress_sim::types::LatestPrices;
use stress_sim::{
    apply_market_stress, calculate_custom_weights, calculate_equal_weights,
    calculate_portfolio_value, rebalance_portfolio, PriceTable, RebalancePolicy, Ticker,
    WeightVector,
};

fn tickers(n: usize) -> Vec<Ticker> {
    (0..n)
        .map(|i| Ticker::parse(&format!("T{}", i)).unwrap())
        .collect()
}

fn table(columns: &[Vec<f64>]) -> PriceTable {
    let len = columns.first().map_or(0, |c| c.len());
    let dates = (0..len)
        .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64))
        .collect();
    let named = tickers(columns.len())
        .into_iter()
        .zip(columns.iter().cloned())
        .collect();
    PriceTable::new(dates, named).unwrap()
}

fn normalized(raw: &[f64]) -> WeightVector {
    let total: f64 = raw.iter().sum();
    WeightVector::new(
        tickers(raw.len())
            .into_iter()
            .zip(raw.iter().map(|w| w / total))
            .collect(),
    )
    .unwrap()
}

/// Price columns of equal length: `(tickers, dates)` grid of positive closes.
fn price_grid() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1usize..5, 1usize..8).prop_flat_map(|(n, len)| {
        prop::collection::vec(prop::collection::vec(1.0f64..500.0, len), n)
    })
}

proptest! {
    #[test]
    fn custom_weights_sum_to_one(counts in prop::collection::vec(1i64..10_000, 1..12)) {
        let names = tickers(counts.len());
        let shares: HashMap<Ticker, i64> = names.iter().cloned().zip(counts.iter().copied()).collect();
        let weights = calculate_custom_weights(&names, &shares).unwrap();
        prop_assert!((weights.sum() - 1.0).abs() < 1e-9);
        for (_, w) in weights.iter() {
            prop_assert!(w > 0.0 && w <= 1.0);
        }
    }

    #[test]
    fn equal_weights_are_one_over_n(n in 1usize..50) {
        let weights = calculate_equal_weights(&tickers(n)).unwrap();
        for (_, w) in weights.iter() {
            assert_abs_diff_eq!(w, 1.0 / n as f64, epsilon = 1e-15);
        }
    }

    #[test]
    fn stress_composes_multiplicatively(grid in price_grid(), f1 in 0.0f64..=1.0, f2 in 0.0f64..=1.0) {
        let prices = table(&grid);
        let twice = apply_market_stress(&apply_market_stress(&prices, f1).unwrap(), f2).unwrap();
        let once = apply_market_stress(&prices, 1.0 - (1.0 - f1) * (1.0 - f2)).unwrap();
        for ((_, a), (_, b)) in twice.columns().zip(once.columns()) {
            for (x, y) in a.iter().zip(b) {
                prop_assert!((x - y).abs() <= 1e-9 * x.abs().max(1.0));
            }
        }
    }

    #[test]
    fn stress_scales_portfolio_value(grid in price_grid(), f in 0.0f64..=1.0) {
        let prices = table(&grid);
        let weights = normalized(&vec![1.0; grid.len()]);
        let base = calculate_portfolio_value(&prices, &weights).unwrap();
        let stressed = calculate_portfolio_value(&apply_market_stress(&prices, f).unwrap(), &weights).unwrap();
        for (b, s) in base.values().iter().zip(stressed.values()) {
            prop_assert!((s - b * (1.0 - f)).abs() <= 1e-9 * b.max(1.0));
        }
    }

    #[test]
    fn value_is_linear_in_prices(
        grid in price_grid(),
        k in 0.001f64..100.0,
        raw_weights in prop::collection::vec(0.01f64..10.0, 5),
    ) {
        let prices = table(&grid);
        let scaled_columns: Vec<Vec<f64>> = grid
            .iter()
            .map(|column| column.iter().map(|p| p * k).collect())
            .collect();
        let scaled = table(&scaled_columns);
        let weights = normalized(&raw_weights[..grid.len()]);

        let base = calculate_portfolio_value(&prices, &weights).unwrap();
        let scaled_value = calculate_portfolio_value(&scaled, &weights).unwrap();
        for (b, s) in base.values().iter().zip(scaled_value.values()) {
            prop_assert!((s - k * b).abs() <= 1e-9 * (k * b).abs().max(1.0));
        }
    }

    #[test]
    fn zero_threshold_returns_target(
        prices in prop::collection::vec(1.0f64..500.0, 2..6),
        raw_target in prop::collection::vec(0.1f64..10.0, 6),
    ) {
        let n = prices.len();
        let names = tickers(n);
        let latest = LatestPrices::new(
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            names.iter().cloned().zip(prices.iter().copied()).collect(),
        );
        let target = normalized(&raw_target[..n]);
        let baseline = normalized(&vec![1.0; n]);

        let result = rebalance_portfolio(&latest, &target, &baseline, 0.0, RebalancePolicy::AsSnapped).unwrap();
        for ((_, got), (_, want)) in result.iter().zip(target.iter()) {
            // unsnapped entries already equal the target
            prop_assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn full_threshold_keeps_drift(
        prices in prop::collection::vec(1.0f64..500.0, 2..6),
    ) {
        let n = prices.len();
        let names = tickers(n);
        let latest = LatestPrices::new(
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            names.iter().cloned().zip(prices.iter().copied()).collect(),
        );
        let baseline = normalized(&vec![1.0; n]);
        let total: f64 = prices.iter().sum();

        let result = rebalance_portfolio(&latest, &baseline, &baseline, 1.0, RebalancePolicy::AsSnapped).unwrap();
        for ((_, w), p) in result.iter().zip(&prices) {
            prop_assert!((w - p / total).abs() < 1e-12);
        }
    }

    #[test]
    fn renormalized_weights_sum_to_one(
        prices in prop::collection::vec(1.0f64..500.0, 2..6),
        threshold in 0.0f64..0.5,
    ) {
        let n = prices.len();
        let latest = LatestPrices::new(
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            tickers(n).into_iter().zip(prices.iter().copied()).collect(),
        );
        let target = normalized(&vec![1.0; n]);
        let result = rebalance_portfolio(&latest, &target, &target, threshold, RebalancePolicy::Renormalize).unwrap();
        prop_assert!((result.sum() - 1.0).abs() < 1e-9);
    }
}
