// Portfolio stress simulator.
//
// Fetches daily closes for a set of tickers, values a share-weighted
// portfolio, applies a uniform price shock and rebalances drifted weights
// back toward a target. Results go to the console and to CSV, JSON, SVG and
// PDF reports.

pub mod config;
pub mod display;
pub mod error;
pub mod fetch;
pub mod rebalance;
pub mod report;
pub mod simulation;
pub mod stress;
pub mod types;
pub mod valuation;
pub mod weights;

pub use error::{FetchError, FetchFailure, Result, SimError};
pub use fetch::{fetch_historical_data, FetchOutcome, FetchedSeries, MarketDataSource};
pub use rebalance::{rebalance_portfolio, RebalancePolicy};
pub use simulation::{run_simulation, RunParameters, SimulationRun};
pub use stress::apply_market_stress;
pub use types::{DateRange, Portfolio, PortfolioValueSeries, PriceTable, Ticker, WeightVector};
pub use valuation::calculate_portfolio_value;
pub use weights::{calculate_custom_weights, calculate_equal_weights};
