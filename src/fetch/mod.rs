// Close-price retrieval.
//
// A MarketDataSource knows how to get one ticker's close prices over a
// date range. Whatever shape the source natively returns is captured once as
// a FetchedSeries and normalized into a single close-per-date column here,
// so nothing downstream branches on response shape.
//
// Batch fetching contains failures per ticker: a ticker that cannot be
// fetched is reported and left out, and the run carries on with the rest.

pub mod csv_file;
pub mod synthetic;
pub mod yahoo;

pub use csv_file::CsvFileSource;
pub use synthetic::SyntheticSource;
pub use yahoo::YahooSource;

use chrono::NaiveDate;
use log::{debug, info, warn};
use polars::prelude::*;
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::display::format_fetch_summary;
use crate::error::{FetchError, FetchFailure, Result, SimError};
use crate::types::{DateRange, PriceTable, Ticker};

/// A pluggable provider of historical close prices.
pub trait MarketDataSource: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Close prices for `ticker` over the inclusive `range`.
    fn close_prices(
        &self,
        ticker: &Ticker,
        range: &DateRange,
    ) -> std::result::Result<FetchedSeries, FetchError>;
}

/// One dated close, as found in record-list responses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub close: f64,
}

/// Raw response shapes a source may produce.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedSeries {
    /// A list of `{date, close}` records in any order.
    RawRecords(Vec<PriceRecord>),
    /// Parallel date and close arrays; a `None` close means no trade that day.
    TabularColumn {
        dates: Vec<NaiveDate>,
        closes: Vec<Option<f64>>,
    },
}

/// A normalized close-price column: ascending unique dates, one close each.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseColumn {
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
}

impl FetchedSeries {
    /// Normalize to a single ascending column restricted to `range`.
    ///
    /// Duplicate dates keep the last close seen; missing closes are skipped.
    pub fn into_column(self, range: &DateRange) -> std::result::Result<CloseColumn, FetchError> {
        let pairs: Vec<(NaiveDate, Option<f64>)> = match self {
            FetchedSeries::RawRecords(records) => records
                .into_iter()
                .map(|r| (r.date, Some(r.close)))
                .collect(),
            FetchedSeries::TabularColumn { dates, closes } => {
                if dates.len() != closes.len() {
                    return Err(FetchError::Malformed(format!(
                        "{} dates but {} closes",
                        dates.len(),
                        closes.len()
                    )));
                }
                dates.into_iter().zip(closes).collect()
            }
        };

        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (date, close) in pairs {
            if !range.contains(date) {
                continue;
            }
            let Some(close) = close else {
                continue;
            };
            if !close.is_finite() || close < 0.0 {
                return Err(FetchError::Malformed(format!(
                    "invalid close {} on {}",
                    close, date
                )));
            }
            by_date.insert(date, close);
        }

        if by_date.is_empty() {
            return Err(FetchError::NoData);
        }

        let (dates, closes) = by_date.into_iter().unzip();
        Ok(CloseColumn { dates, closes })
    }
}

/// Surviving prices plus the tickers that were dropped.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub table: PriceTable,
    pub failures: Vec<FetchFailure>,
}

fn fetch_one(
    source: &dyn MarketDataSource,
    ticker: &Ticker,
    range: &DateRange,
) -> std::result::Result<CloseColumn, FetchError> {
    debug!("Fetching {} from {} for {}", ticker, source.name(), range);
    source.close_prices(ticker, range)?.into_column(range)
}

/// Fetch every ticker independently and assemble a price table.
///
/// Failed tickers are logged, collected in [`FetchOutcome::failures`] and
/// omitted. Surviving columns are aligned on the dates they all share. With
/// `parallel` set, tickers are fetched on the rayon pool; column order is the
/// input order either way.
///
/// Returns [`SimError::EmptyResult`] when nothing survives, including for an
/// empty ticker list.
pub fn fetch_historical_data(
    source: &dyn MarketDataSource,
    tickers: &[Ticker],
    range: &DateRange,
    parallel: bool,
) -> Result<FetchOutcome> {
    info!(
        "Fetching {} tickers from {} for {}",
        tickers.len(),
        source.name(),
        range
    );

    let results: Vec<(Ticker, std::result::Result<CloseColumn, FetchError>)> = if parallel {
        tickers
            .par_iter()
            .map(|ticker| (ticker.clone(), fetch_one(source, ticker, range)))
            .collect()
    } else {
        tickers
            .iter()
            .map(|ticker| (ticker.clone(), fetch_one(source, ticker, range)))
            .collect()
    };

    let mut columns = Vec::new();
    let mut failures = Vec::new();
    for (ticker, result) in results {
        match result {
            Ok(column) => columns.push((ticker, column)),
            Err(error) => {
                let failure = FetchFailure { ticker, error };
                warn!("{}", failure);
                failures.push(failure);
            }
        }
    }

    info!("{}", format_fetch_summary(columns.len(), failures.len()));

    if columns.is_empty() {
        return Err(SimError::EmptyResult { failures });
    }

    match align_columns(columns)? {
        Some(table) => Ok(FetchOutcome { table, failures }),
        None => Err(SimError::EmptyResult { failures }),
    }
}

/// Inner-join every column on `date`, keeping only dates they all share.
/// `None` if no date is shared.
fn align_columns(columns: Vec<(Ticker, CloseColumn)>) -> Result<Option<PriceTable>> {
    let mut joined: Option<LazyFrame> = None;
    for (ticker, column) in &columns {
        let frame = df!(
            "date" => column.dates.clone(),
            ticker.as_str() => column.closes.clone()
        )?
        .lazy();
        joined = Some(match joined {
            None => frame,
            Some(acc) => acc.join(
                frame,
                [col("date")],
                [col("date")],
                JoinArgs::new(JoinType::Inner),
            ),
        });
    }
    let Some(joined) = joined else {
        return Ok(None);
    };

    let aligned = joined
        .sort(["date"], SortMultipleOptions::default())
        .collect()?;
    if aligned.height() == 0 {
        warn!("Fetched tickers share no dates");
        return Ok(None);
    }

    let dates: Vec<NaiveDate> = aligned
        .column("date")?
        .date()?
        .as_date_iter()
        .flatten()
        .collect();
    let mut closes = Vec::with_capacity(columns.len());
    for (ticker, column) in &columns {
        let dropped = column.dates.len() - aligned.height();
        if dropped > 0 {
            warn!(
                "Dropping {} dates for {} not shared by every ticker",
                dropped, ticker
            );
        }
        let values: Vec<f64> = aligned
            .column(ticker.as_str())?
            .f64()?
            .into_no_null_iter()
            .collect();
        closes.push((ticker.clone(), values));
    }

    PriceTable::new(dates, closes).map(Some)
}
