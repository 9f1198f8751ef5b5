// Threshold rebalancing toward target weights.
//
// Price moves since the baseline was struck shift each ticker's share of
// portfolio value. Any ticker whose implied weight has drifted further than
// the threshold from its target is snapped back to the target; the rest keep
// their drifted weight.

use log::{debug, warn};
use serde::Serialize;

use crate::error::{Result, SimError};
use crate::types::{LatestPrices, PriceTable, Ticker, WeightVector};

/// Drift tolerated before a ticker is reset to its target weight.
pub const DEFAULT_REBALANCE_THRESHOLD: f64 = 0.02;

/// What happens to the weight vector after snapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalancePolicy {
    /// Return the mix of snapped and drifted weights as is. The result may
    /// not sum to one.
    #[default]
    AsSnapped,
    /// Divide by the sum after snapping so the result sums to one.
    Renormalize,
}

/// Per-ticker view of one rebalancing decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftRow {
    pub ticker: Ticker,
    pub current: f64,
    pub target: f64,
    pub drift: f64,
    pub snapped: bool,
}

/// Most recent close per ticker.
pub fn latest_prices(prices: &PriceTable) -> Result<LatestPrices> {
    prices
        .latest()
        .ok_or_else(|| SimError::InvalidPriceTable("price table has no dates".to_string()))
}

/// Implied current weights: `latest[t] * baseline[t]`, normalized across
/// all tickers in `latest`.
pub fn current_weights(latest: &LatestPrices, baseline: &WeightVector) -> Result<WeightVector> {
    let values = latest
        .iter()
        .map(|(ticker, price)| {
            baseline
                .get(ticker)
                .map(|weight| (ticker.clone(), price * weight))
                .ok_or_else(|| SimError::UnknownTicker(ticker.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    let total: f64 = values.iter().map(|(_, v)| v).sum();
    if total == 0.0 {
        warn!(
            "Portfolio value is zero on {}; keeping baseline weights as current weights",
            latest.date()
        );
        let entries = values
            .into_iter()
            .map(|(ticker, _)| {
                let weight = baseline.get(&ticker).unwrap_or_default();
                (ticker, weight)
            })
            .collect();
        return WeightVector::new(entries);
    }

    WeightVector::new(
        values
            .into_iter()
            .map(|(ticker, value)| (ticker, value / total))
            .collect(),
    )
}

/// Per-ticker drift against target and whether it crosses `threshold`.
pub fn drift_report(
    latest: &LatestPrices,
    target: &WeightVector,
    baseline: &WeightVector,
    threshold: f64,
) -> Result<Vec<DriftRow>> {
    check_threshold(threshold)?;
    let current = current_weights(latest, baseline)?;
    current
        .iter()
        .map(|(ticker, current)| {
            let target = target
                .get(ticker)
                .ok_or_else(|| SimError::UnknownTicker(ticker.clone()))?;
            let drift = current - target;
            Ok(DriftRow {
                ticker: ticker.clone(),
                current,
                target,
                drift,
                snapped: drift.abs() > threshold,
            })
        })
        .collect()
}

/// Rebalance drifted weights toward `target`.
///
/// A threshold of zero snaps every ticker whose weight differs from target at
/// all, giving the target vector back; a threshold of one or more keeps the
/// drifted weights. Returns a new vector; inputs are not modified.
pub fn rebalance_portfolio(
    latest: &LatestPrices,
    target: &WeightVector,
    baseline: &WeightVector,
    threshold: f64,
    policy: RebalancePolicy,
) -> Result<WeightVector> {
    let rows = drift_report(latest, target, baseline, threshold)?;

    let snapped: Vec<(Ticker, f64)> = rows
        .into_iter()
        .map(|row| {
            if row.snapped {
                debug!(
                    "{} drifted {:+.4} from target {:.4}, snapping",
                    row.ticker, row.drift, row.target
                );
                (row.ticker, row.target)
            } else {
                (row.ticker, row.current)
            }
        })
        .collect();

    match policy {
        RebalancePolicy::AsSnapped => WeightVector::new(snapped),
        RebalancePolicy::Renormalize => {
            let total: f64 = snapped.iter().map(|(_, w)| w).sum();
            if total == 0.0 {
                return WeightVector::new(snapped);
            }
            WeightVector::new(
                snapped
                    .into_iter()
                    .map(|(ticker, w)| (ticker, w / total))
                    .collect(),
            )
        }
    }
}

fn check_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidThreshold(threshold))
    }
}
