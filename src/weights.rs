// Portfolio weights from share counts or equal allocation.

use std::collections::HashMap;

use crate::error::{Result, SimError};
use crate::types::{Ticker, WeightVector};

/// Fails with `InvalidAllocation` unless every ticker has a share count and
/// the counts sum to a positive number.
pub fn check_allocation(tickers: &[Ticker], shares: &HashMap<Ticker, i64>) -> Result<i64> {
    if tickers.is_empty() {
        return Err(SimError::InvalidAllocation("no tickers given".to_string()));
    }

    let mut total: i64 = 0;
    for ticker in tickers {
        let count = shares.get(ticker).ok_or_else(|| {
            SimError::InvalidAllocation(format!("no share count for {}", ticker))
        })?;
        total = total.checked_add(*count).ok_or_else(|| {
            SimError::InvalidAllocation("share counts overflow".to_string())
        })?;
    }

    if total <= 0 {
        return Err(SimError::InvalidAllocation(format!(
            "share counts sum to {}, expected a positive total",
            total
        )));
    }
    Ok(total)
}

/// `weight[t] = shares[t] / Σ shares`, in ticker order.
pub fn calculate_custom_weights(
    tickers: &[Ticker],
    shares: &HashMap<Ticker, i64>,
) -> Result<WeightVector> {
    let total = check_allocation(tickers, shares)? as f64;
    let entries = tickers
        .iter()
        .map(|ticker| {
            let count = shares.get(ticker).copied().unwrap_or_default();
            (ticker.clone(), count as f64 / total)
        })
        .collect();
    WeightVector::new(entries)
}

/// `1 / N` for each of the `N` tickers.
pub fn calculate_equal_weights(tickers: &[Ticker]) -> Result<WeightVector> {
    if tickers.is_empty() {
        return Err(SimError::InvalidAllocation(
            "equal allocation needs at least one ticker".to_string(),
        ));
    }
    let weight = 1.0 / tickers.len() as f64;
    WeightVector::new(tickers.iter().map(|t| (t.clone(), weight)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tickers(names: &[&str]) -> Vec<Ticker> {
        names.iter().filter_map(|n| Ticker::parse(n)).collect()
    }

    fn shares(pairs: &[(&str, i64)]) -> HashMap<Ticker, i64> {
        pairs
            .iter()
            .map(|(n, c)| (Ticker::parse(n).unwrap(), *c))
            .collect()
    }

    #[test]
    fn test_custom_weights_from_share_counts() {
        let t = tickers(&["TCS.NS", "INFY.NS", "RELIANCE.NS"]);
        let s = shares(&[("TCS.NS", 10), ("INFY.NS", 30), ("RELIANCE.NS", 60)]);
        let w = calculate_custom_weights(&t, &s).unwrap();

        assert_abs_diff_eq!(w.get(&t[0]).unwrap(), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(w.get(&t[1]).unwrap(), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(w.get(&t[2]).unwrap(), 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_custom_weights_keep_ticker_order() {
        let t = tickers(&["B", "A"]);
        let s = shares(&[("A", 1), ("B", 3)]);
        let w = calculate_custom_weights(&t, &s).unwrap();
        let order: Vec<&str> = w.tickers().map(|t| t.as_str()).collect();
        assert_eq!(order, vec!["B", "A"]);
    }

    #[test]
    fn test_zero_total_is_invalid_allocation() {
        let t = tickers(&["A", "B"]);
        let s = shares(&[("A", 0), ("B", 0)]);
        let result = calculate_custom_weights(&t, &s);
        assert!(matches!(result, Err(SimError::InvalidAllocation(_))));
    }

    #[test]
    fn test_negative_total_is_invalid_allocation() {
        let t = tickers(&["A", "B"]);
        let s = shares(&[("A", -5), ("B", 2)]);
        assert!(matches!(
            check_allocation(&t, &s),
            Err(SimError::InvalidAllocation(_))
        ));
    }

    #[test]
    fn test_missing_share_count_is_invalid_allocation() {
        let t = tickers(&["A", "B"]);
        let s = shares(&[("A", 5)]);
        let err = calculate_custom_weights(&t, &s).unwrap_err();
        assert!(err.to_string().contains("B"));
    }

    #[test]
    fn test_equal_weights() {
        let t = tickers(&["A", "B", "C"]);
        let w = calculate_equal_weights(&t).unwrap();
        for (_, weight) in w.iter() {
            assert_abs_diff_eq!(weight, 1.0 / 3.0, epsilon = 1e-9);
        }
        assert!(calculate_equal_weights(&[]).is_err());
    }
}
