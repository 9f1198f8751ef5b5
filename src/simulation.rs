// The end-to-end stress run: fetch, weight, stress, rebalance.

use chrono::NaiveDate;
use log::info;
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::config::{SimulationConfig, TargetMode};
use crate::error::{FetchFailure, Result};
use crate::fetch::{fetch_historical_data, MarketDataSource};
use crate::rebalance::{drift_report, latest_prices, rebalance_portfolio, DriftRow, RebalancePolicy};
use crate::stress::apply_market_stress;
use crate::types::{DateRange, Portfolio, Ticker, WeightVector};
use crate::weights::{calculate_custom_weights, calculate_equal_weights, check_allocation};

pub const INITIAL: &str = "Initial Portfolio";
pub const STRESSED: &str = "Stressed Portfolio";
pub const REBALANCED: &str = "Rebalanced Portfolio";

/// Inputs of one run, independent of where they were parsed from.
#[derive(Debug, Clone)]
pub struct RunParameters {
    pub tickers: Vec<Ticker>,
    pub shares: HashMap<Ticker, i64>,
    pub range: DateRange,
    pub stress_factor: f64,
    pub threshold: f64,
    pub target: TargetMode,
    pub policy: RebalancePolicy,
    pub parallel: bool,
}

impl From<&SimulationConfig> for RunParameters {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            tickers: config.tickers.clone(),
            shares: config.shares.clone(),
            range: config.range,
            stress_factor: config.stress_factor,
            threshold: config.threshold,
            target: config.target,
            policy: config.policy,
            parallel: config.parallel,
        }
    }
}

/// Outcome of a run: the three portfolios in pipeline order.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub range: DateRange,
    pub portfolios: Vec<Portfolio>,
    pub drift: Vec<DriftRow>,
    pub failures: Vec<FetchFailure>,
    pub stress_factor: f64,
    pub threshold: f64,
    pub policy: RebalancePolicy,
}

impl SimulationRun {
    pub fn portfolio(&self, name: &str) -> Option<&Portfolio> {
        self.portfolios.iter().find(|p| p.name() == name)
    }

    /// Value per date with one column per portfolio, keyed by the union of
    /// their dates. A portfolio without a value on some date leaves a null.
    pub fn value_frame(&self) -> Result<DataFrame> {
        let mut rows: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        let width = self.portfolios.len();
        for (idx, portfolio) in self.portfolios.iter().enumerate() {
            for (date, value) in portfolio.value_series()?.iter() {
                rows.entry(date).or_insert_with(|| vec![None; width])[idx] = Some(value);
            }
        }

        let dates: Vec<String> = rows.keys().map(|d| d.format("%Y-%m-%d").to_string()).collect();
        let mut columns = vec![Column::new("Date".into(), dates)];
        for (idx, portfolio) in self.portfolios.iter().enumerate() {
            let values: Vec<Option<f64>> = rows.values().map(|row| row[idx]).collect();
            columns.push(Column::new(portfolio.name().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }

    pub fn summary(&self) -> Result<RunSummary> {
        Ok(RunSummary {
            date_range: self.range,
            stress_factor: self.stress_factor,
            threshold: self.threshold,
            policy: self.policy,
            portfolios: self
                .portfolios
                .iter()
                .map(PortfolioSummary::from_portfolio)
                .collect::<Result<Vec<_>>>()?,
            drift: self.drift.clone(),
            failed_tickers: self
                .failures
                .iter()
                .map(|f| FailedTicker {
                    ticker: f.ticker.clone(),
                    reason: f.error.to_string(),
                })
                .collect(),
        })
    }
}

/// JSON-friendly digest of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub date_range: DateRange,
    pub stress_factor: f64,
    pub threshold: f64,
    pub policy: RebalancePolicy,
    pub portfolios: Vec<PortfolioSummary>,
    pub drift: Vec<DriftRow>,
    pub failed_tickers: Vec<FailedTicker>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedTicker {
    pub ticker: Ticker,
    pub reason: String,
}

/// Per-portfolio figures for the JSON summary.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSummary {
    pub name: String,
    pub weights: WeightVector,
    pub weight_sum: f64,
    pub first_value: Option<f64>,
    pub last_value: Option<f64>,
    pub change_pct: Option<f64>,
}

impl PortfolioSummary {
    pub fn from_portfolio(portfolio: &Portfolio) -> Result<Self> {
        let series = portfolio.value_series()?;
        Ok(Self {
            name: portfolio.name().to_string(),
            weights: portfolio.weights().clone(),
            weight_sum: portfolio.weights().sum(),
            first_value: series.first(),
            last_value: series.last(),
            change_pct: series.change_pct(),
        })
    }
}

/// Run the full pipeline against `source`.
///
/// Allocation problems abort before anything is fetched. Per-ticker fetch
/// failures are carried in the result; if no ticker survives the run stops
/// with `EmptyResult`.
pub fn run_simulation(params: &RunParameters, source: &dyn MarketDataSource) -> Result<SimulationRun> {
    check_allocation(&params.tickers, &params.shares)?;

    let fetched = fetch_historical_data(source, &params.tickers, &params.range, params.parallel)?;
    let prices = fetched.table;
    let survivors = prices.tickers().to_vec();

    let custom_weights = calculate_custom_weights(&survivors, &params.shares)?;
    let initial = Portfolio::new(INITIAL, prices.clone(), custom_weights.clone());
    info!("{}: {} tickers over {} dates", INITIAL, survivors.len(), prices.len());

    let stressed_prices = apply_market_stress(&prices, params.stress_factor)?;
    let stressed = Portfolio::new(STRESSED, stressed_prices.clone(), custom_weights.clone());
    info!("{}: prices scaled by {:.4}", STRESSED, 1.0 - params.stress_factor);

    let target = match params.target {
        TargetMode::Custom => custom_weights.clone(),
        TargetMode::Equal => calculate_equal_weights(&survivors)?,
    };
    let latest = latest_prices(&stressed_prices)?;
    let drift = drift_report(&latest, &target, &custom_weights, params.threshold)?;
    let rebalanced_weights = rebalance_portfolio(
        &latest,
        &target,
        &custom_weights,
        params.threshold,
        params.policy,
    )?;
    info!(
        "{}: {} of {} tickers snapped to target",
        REBALANCED,
        drift.iter().filter(|row| row.snapped).count(),
        drift.len()
    );
    let rebalanced = Portfolio::new(REBALANCED, stressed_prices, rebalanced_weights);

    Ok(SimulationRun {
        range: params.range,
        portfolios: vec![initial, stressed, rebalanced],
        drift,
        failures: fetched.failures,
        stress_factor: params.stress_factor,
        threshold: params.threshold,
        policy: params.policy,
    })
}
