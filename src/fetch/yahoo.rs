// Yahoo Finance daily history through the `yahoo_finance_api` connector.

use chrono::{DateTime, Duration, NaiveDate};
use log::debug;
use time::OffsetDateTime;
use yahoo_finance_api::{YahooConnector, YahooError};

use super::{FetchedSeries, MarketDataSource};
use crate::error::FetchError;
use crate::types::{DateRange, Ticker};

const SOURCE_NAME: &str = "yahoo";

/// Daily closes from Yahoo Finance.
pub struct YahooSource {
    connector: YahooConnector,
}

impl YahooSource {
    pub fn new() -> Self {
        Self {
            connector: YahooConnector::new(),
        }
    }
}

impl Default for YahooSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketDataSource for YahooSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn close_prices(
        &self,
        ticker: &Ticker,
        range: &DateRange,
    ) -> std::result::Result<FetchedSeries, FetchError> {
        let (start, end) = query_window(range)?;
        debug!("Quote history for {} from {} to {}", ticker, start, end);

        let response = self
            .connector
            .get_quote_history(ticker.as_str(), start, end)
            .map_err(map_yahoo_error)?;
        let quotes = response.quotes().map_err(map_yahoo_error)?;
        // Exchange offset puts the session timestamp on its local trading day
        let offset = response
            .metadata()
            .map(|meta| i64::from(meta.gmtoffset))
            .unwrap_or(0);

        let mut rows = Vec::with_capacity(quotes.len());
        for quote in &quotes {
            let timestamp = i64::try_from(quote.timestamp).map_err(|_| {
                FetchError::Malformed(format!("bad timestamp {}", quote.timestamp))
            })?;
            rows.push((timestamp, quote.close));
        }
        daily_closes(rows, offset)
    }
}

/// Inclusive `range` as the connector's `[start, end)` window.
fn query_window(
    range: &DateRange,
) -> std::result::Result<(OffsetDateTime, OffsetDateTime), FetchError> {
    let start = day_start(range.start())?;
    // the upper bound is exclusive upstream, so ask for the day after `end`
    let end = day_start(range.end() + Duration::days(1))?;
    Ok((start, end))
}

fn day_start(date: NaiveDate) -> std::result::Result<OffsetDateTime, FetchError> {
    let seconds = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default();
    OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|e| FetchError::Malformed(format!("date {} out of range: {}", date, e)))
}

/// Turn `(unix seconds, close)` rows into a tabular series, shifting each
/// timestamp by the exchange's `gmtoffset` before taking its date.
pub(crate) fn daily_closes(
    rows: impl IntoIterator<Item = (i64, f64)>,
    gmtoffset: i64,
) -> std::result::Result<FetchedSeries, FetchError> {
    let mut dates = Vec::new();
    let mut closes = Vec::new();
    for (timestamp, close) in rows {
        let date = timestamp
            .checked_add(gmtoffset)
            .and_then(|local| DateTime::from_timestamp(local, 0))
            .map(|dt| dt.date_naive())
            .ok_or_else(|| FetchError::Malformed(format!("bad timestamp {}", timestamp)))?;
        dates.push(date);
        closes.push(close.is_finite().then_some(close));
    }
    Ok(FetchedSeries::TabularColumn { dates, closes })
}

/// Map connector errors onto per-ticker fetch failures.
pub(crate) fn map_yahoo_error(err: YahooError) -> FetchError {
    match err {
        YahooError::FetchFailed(status) if status.contains("404") => {
            FetchError::UnsupportedTicker {
                source_name: SOURCE_NAME.to_string(),
            }
        }
        YahooError::FetchFailed(status) => FetchError::Network(status),
        YahooError::ConnectionFailed(e) => FetchError::Network(e.to_string()),
        YahooError::EmptyDataSet => FetchError::NoData,
        other => FetchError::Malformed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_offset_sets_trading_day() {
        // NSE sessions open at 03:45 UTC; +05:30 keeps them on the same day
        let rows = vec![
            (1704166200, 3790.5),
            (1704252600, f64::NAN),
            (1704339000, 3712.25),
        ];
        match daily_closes(rows, 19800).unwrap() {
            FetchedSeries::TabularColumn { dates, closes } => {
                assert_eq!(
                    dates,
                    vec![
                        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                        NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
                    ]
                );
                assert_eq!(closes, vec![Some(3790.5), None, Some(3712.25)]);
            }
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn test_overflowing_timestamp_is_malformed() {
        let rows = vec![(9223372036854775800, 100.0)];
        assert!(matches!(
            daily_closes(rows, 19800),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_out_of_range_timestamp_is_malformed() {
        assert!(matches!(
            daily_closes(vec![(i64::MIN + 1, 1.0)], 0),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            map_yahoo_error(YahooError::FetchFailed("404 Not Found".to_string())),
            FetchError::UnsupportedTicker { .. }
        ));
        assert!(matches!(
            map_yahoo_error(YahooError::FetchFailed("503 Service Unavailable".to_string())),
            FetchError::Network(_)
        ));
        assert_eq!(map_yahoo_error(YahooError::EmptyDataSet), FetchError::NoData);
        assert!(matches!(
            map_yahoo_error(YahooError::DataInconsistency),
            FetchError::Malformed(_)
        ));
    }

    #[test]
    fn test_query_window_covers_inclusive_end() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        let (start, end) = query_window(&range).unwrap();
        assert_eq!(start.unix_timestamp(), 1704067200);
        assert_eq!(end.unix_timestamp(), 1706745600);
    }
}
