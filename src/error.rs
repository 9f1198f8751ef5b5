// Error types for the stress simulator.

use crate::types::Ticker;

/// Per-ticker failure from a market-data source.
///
/// These never abort a run on their own: the fetcher drops the ticker and
/// records the failure so it can be shown to the user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("data source unreachable: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("ticker not supported by {source_name}")]
    UnsupportedTicker { source_name: String },

    #[error("no prices in the requested date range")]
    NoData,

    #[error("failed to read price data: {0}")]
    Io(String),
}

/// A ticker that could not be fetched, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub ticker: Ticker,
    pub error: FetchError,
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error fetching data for {}: {}", self.ticker, self.error)
    }
}

/// All errors that can abort a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid allocation: {0}")]
    InvalidAllocation(String),

    #[error("no tickers survived fetching ({} failed)", .failures.len())]
    EmptyResult { failures: Vec<FetchFailure> },

    #[error("weight references ticker {0} with no price column")]
    UnknownTicker(Ticker),

    #[error("stress factor must be within [0, 1], got {0}")]
    InvalidStressFactor(f64),

    #[error("rebalance threshold must be a non-negative number, got {0}")]
    InvalidThreshold(f64),

    #[error("invalid price table: {0}")]
    InvalidPriceTable(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("table error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
