// Domain types shared by every stage of the simulation.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{Result, SimError};
use crate::valuation::calculate_portfolio_value;

/// Symbol of a tradable instrument, always trimmed and upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Normalize free text into a ticker. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_uppercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SimError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every calendar day in the range, weekends included.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Date-indexed close prices with one column per ticker.
///
/// Dates are strictly ascending and every column has one finite,
/// non-negative price per date.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<Ticker>,
    columns: Vec<Vec<f64>>,
}

impl PriceTable {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<(Ticker, Vec<f64>)>) -> Result<Self> {
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SimError::InvalidPriceTable(
                "dates must be strictly ascending".to_string(),
            ));
        }

        let mut tickers = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for (ticker, column) in columns {
            if tickers.contains(&ticker) {
                return Err(SimError::InvalidPriceTable(format!(
                    "duplicate column {}",
                    ticker
                )));
            }
            if column.len() != dates.len() {
                return Err(SimError::InvalidPriceTable(format!(
                    "column {} has {} prices for {} dates",
                    ticker,
                    column.len(),
                    dates.len()
                )));
            }
            if let Some(bad) = column.iter().find(|p| !p.is_finite() || **p < 0.0) {
                return Err(SimError::InvalidPriceTable(format!(
                    "column {} contains invalid price {}",
                    ticker, bad
                )));
            }
            tickers.push(ticker);
            values.push(column);
        }

        Ok(Self {
            dates,
            tickers,
            columns: values,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn column(&self, ticker: &Ticker) -> Option<&[f64]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|idx| self.columns[idx].as_slice())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&Ticker, &[f64])> {
        self.tickers
            .iter()
            .zip(self.columns.iter().map(|c| c.as_slice()))
    }

    /// Number of dates in the index.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Prices on the most recent date, in column order.
    pub fn latest(&self) -> Option<LatestPrices> {
        let date = *self.dates.last()?;
        let idx = self.dates.len() - 1;
        let prices = self
            .columns()
            .map(|(ticker, column)| (ticker.clone(), column[idx]))
            .collect();
        Some(LatestPrices { date, prices })
    }

    /// Apply `f` to every price. The caller guarantees `f` keeps prices
    /// finite and non-negative.
    pub(crate) fn map_prices(&self, f: impl Fn(f64) -> f64) -> PriceTable {
        PriceTable {
            dates: self.dates.clone(),
            tickers: self.tickers.clone(),
            columns: self
                .columns
                .iter()
                .map(|column| column.iter().map(|p| f(*p)).collect())
                .collect(),
        }
    }

    /// Wide frame: a `date` column followed by one column per ticker.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns = Vec::with_capacity(self.tickers.len() + 1);
        let dates: Vec<String> = self
            .dates
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect();
        columns.push(Column::new("date".into(), dates));
        for (ticker, column) in self.columns() {
            columns.push(Column::new(ticker.as_str().into(), column.to_vec()));
        }
        DataFrame::new(columns)
    }
}

/// One row of a price table: the most recent close per ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestPrices {
    date: NaiveDate,
    prices: Vec<(Ticker, f64)>,
}

impl LatestPrices {
    pub fn new(date: NaiveDate, prices: Vec<(Ticker, f64)>) -> Self {
        Self { date, prices }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn get(&self, ticker: &Ticker) -> Option<f64> {
        self.prices
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ticker, f64)> {
        self.prices.iter().map(|(t, p)| (t, *p))
    }
}

/// Fractional allocation per ticker, in display order.
///
/// Initial and target vectors sum to one; drifted or snapped vectors
/// produced by the rebalancer need not.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightVector {
    entries: Vec<(Ticker, f64)>,
}

impl WeightVector {
    pub fn new(entries: Vec<(Ticker, f64)>) -> Result<Self> {
        for (idx, (ticker, weight)) in entries.iter().enumerate() {
            if entries[..idx].iter().any(|(t, _)| t == ticker) {
                return Err(SimError::InvalidAllocation(format!(
                    "ticker {} appears more than once",
                    ticker
                )));
            }
            if !weight.is_finite() {
                return Err(SimError::InvalidAllocation(format!(
                    "weight for {} is not finite",
                    ticker
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, ticker: &Ticker) -> Option<f64> {
        self.entries
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, w)| *w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ticker, f64)> {
        self.entries.iter().map(|(t, w)| (t, *w))
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.entries.iter().map(|(t, _)| t)
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for WeightVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (ticker, weight) in &self.entries {
            map.serialize_entry(ticker.as_str(), weight)?;
        }
        map.end()
    }
}

/// Portfolio value per date, derived from a price table and weights.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioValueSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl PortfolioValueSeries {
    pub(crate) fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self { dates, values }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Percentage change from the first to the last value.
    pub fn change_pct(&self) -> Option<f64> {
        let first = self.first()?;
        let last = self.last()?;
        if first == 0.0 {
            return None;
        }
        Some((last / first - 1.0) * 100.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }
}

/// One holdings row: ticker, weight and most recent close.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub ticker: Ticker,
    pub weight: f64,
    pub latest_price: f64,
}

/// A named pairing of prices and weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    name: String,
    prices: PriceTable,
    weights: WeightVector,
}

impl Portfolio {
    pub fn new(name: impl Into<String>, prices: PriceTable, weights: WeightVector) -> Self {
        Self {
            name: name.into(),
            prices,
            weights,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    /// Recomputed on every call; nothing is cached.
    pub fn value_series(&self) -> Result<PortfolioValueSeries> {
        calculate_portfolio_value(&self.prices, &self.weights)
    }

    pub fn holdings(&self) -> Result<Vec<Holding>> {
        let latest = self.prices.latest();
        self.weights
            .iter()
            .map(|(ticker, weight)| {
                let latest_price = latest
                    .as_ref()
                    .and_then(|row| row.get(ticker))
                    .ok_or_else(|| SimError::UnknownTicker(ticker.clone()))?;
                Ok(Holding {
                    ticker: ticker.clone(),
                    weight,
                    latest_price,
                })
            })
            .collect()
    }

    /// Holdings as a `Ticker | Weight | Latest Price` frame.
    pub fn holdings_frame(&self) -> Result<DataFrame> {
        let holdings = self.holdings()?;
        let tickers: Vec<String> = holdings.iter().map(|h| h.ticker.to_string()).collect();
        let weights: Vec<f64> = holdings.iter().map(|h| h.weight).collect();
        let prices: Vec<f64> = holdings.iter().map(|h| h.latest_price).collect();
        let df = df! {
            "Ticker" => tickers,
            "Weight" => weights,
            "Latest Price" => prices,
        }?;
        Ok(df)
    }
}
