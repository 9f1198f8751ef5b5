// Portfolio value series from prices and weights.

use crate::error::{Result, SimError};
use crate::types::{PortfolioValueSeries, PriceTable, WeightVector};

/// For each date, `Σ price[date][t] * weight[t]` over the weighted tickers.
///
/// Every weighted ticker must have a price column. Columns without a weight
/// do not contribute. Summation follows weight order, so the same inputs
/// always give the same bits.
pub fn calculate_portfolio_value(
    prices: &PriceTable,
    weights: &WeightVector,
) -> Result<PortfolioValueSeries> {
    let weighted_columns = weights
        .iter()
        .map(|(ticker, weight)| {
            prices
                .column(ticker)
                .map(|column| (column, weight))
                .ok_or_else(|| SimError::UnknownTicker(ticker.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    let values: Vec<f64> = (0..prices.len())
        .map(|idx| {
            weighted_columns
                .iter()
                .map(|(column, weight)| column[idx] * weight)
                .sum::<f64>()
        })
        .collect();

    Ok(PortfolioValueSeries::new(prices.dates().to_vec(), values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ticker;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    fn dates(n: u32) -> Vec<NaiveDate> {
        (1..=n)
            .map(|day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap())
            .collect()
    }

    #[test]
    fn test_weighted_sum_per_date() {
        let prices = PriceTable::new(
            dates(2),
            vec![(t("A"), vec![100.0, 120.0]), (t("B"), vec![100.0, 80.0])],
        )
        .unwrap();
        let weights = WeightVector::new(vec![(t("A"), 0.5), (t("B"), 0.5)]).unwrap();
        let series = calculate_portfolio_value(&prices, &weights).unwrap();

        assert_eq!(series.dates(), prices.dates());
        assert_abs_diff_eq!(series.values()[0], 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(series.values()[1], 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_ticker_is_an_error() {
        let prices = PriceTable::new(dates(1), vec![(t("A"), vec![100.0])]).unwrap();
        let weights = WeightVector::new(vec![(t("A"), 0.5), (t("Z"), 0.5)]).unwrap();
        match calculate_portfolio_value(&prices, &weights) {
            Err(SimError::UnknownTicker(ticker)) => assert_eq!(ticker.as_str(), "Z"),
            other => panic!("expected UnknownTicker, got {:?}", other),
        }
    }

    #[test]
    fn test_unweighted_columns_are_ignored() {
        let prices = PriceTable::new(
            dates(1),
            vec![(t("A"), vec![100.0]), (t("B"), vec![1_000.0])],
        )
        .unwrap();
        let weights = WeightVector::new(vec![(t("A"), 1.0)]).unwrap();
        let series = calculate_portfolio_value(&prices, &weights).unwrap();
        assert_eq!(series.values(), &[100.0]);
    }

    #[test]
    fn test_recomputation_is_reproducible() {
        let prices = PriceTable::new(
            dates(3),
            vec![(t("A"), vec![101.3, 99.7, 104.1]), (t("B"), vec![47.2, 48.9, 46.0])],
        )
        .unwrap();
        let weights = WeightVector::new(vec![(t("A"), 0.3), (t("B"), 0.7)]).unwrap();
        let first = calculate_portfolio_value(&prices, &weights).unwrap();
        let second = calculate_portfolio_value(&prices, &weights).unwrap();
        assert_eq!(first, second);
    }
}
