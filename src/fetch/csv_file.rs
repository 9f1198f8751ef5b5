// Long-format price file: one date,ticker,close row per observation.

use log::{debug, info};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::io::{self, Cursor};
use std::path::Path;

use super::{FetchedSeries, MarketDataSource, PriceRecord};
use crate::error::{FetchError, Result};
use crate::types::{DateRange, Ticker};

const SOURCE_NAME: &str = "csv";

/// Prices loaded once from a CSV file and served per ticker.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    prices: DataFrame,
}

impl CsvFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading price file {}", path.display());
        // Read every field as text; types are fixed up in `from_frame`
        let frame = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?;
        Self::from_frame(frame)
    }

    pub fn from_reader<R: io::Read>(mut rdr: R) -> Result<Self> {
        let mut bytes = Vec::new();
        rdr.read_to_end(&mut bytes)?;
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;
        Self::from_frame(frame.lazy())
    }

    fn from_frame(frame: LazyFrame) -> Result<Self> {
        let prices = frame
            .select([
                col("date")
                    .str()
                    .to_date(StrptimeOptions {
                        format: Some("%Y-%m-%d".into()),
                        ..Default::default()
                    })
                    .alias("date"),
                col("ticker").str().to_uppercase().alias("ticker"),
                col("close").strict_cast(DataType::Float64).alias("close"),
            ])
            .collect()?;
        debug!("Loaded {} price rows", prices.height());
        Ok(Self { prices })
    }

    /// Distinct tickers in the file, sorted.
    pub fn tickers(&self) -> Result<Vec<Ticker>> {
        let names = self.prices.column("ticker")?.str()?;
        let unique: BTreeSet<Ticker> = names
            .into_iter()
            .flatten()
            .filter_map(Ticker::parse)
            .collect();
        Ok(unique.into_iter().collect())
    }

    fn records(&self, ticker: &Ticker) -> PolarsResult<Vec<PriceRecord>> {
        let rows = self
            .prices
            .clone()
            .lazy()
            .filter(col("ticker").eq(lit(ticker.as_str())))
            .select([col("date"), col("close")])
            .collect()?;

        let dates = rows.column("date")?.date()?;
        let closes = rows.column("close")?.f64()?;
        Ok(dates
            .as_date_iter()
            .zip(closes.iter())
            .filter_map(|(date, close)| {
                Some(PriceRecord {
                    date: date?,
                    close: close?,
                })
            })
            .collect())
    }
}

impl MarketDataSource for CsvFileSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn close_prices(
        &self,
        ticker: &Ticker,
        _range: &DateRange,
    ) -> std::result::Result<FetchedSeries, FetchError> {
        let records = self
            .records(ticker)
            .map_err(|e| FetchError::Io(e.to_string()))?;
        if records.is_empty() {
            return Err(FetchError::UnsupportedTicker {
                source_name: SOURCE_NAME.to_string(),
            });
        }
        Ok(FetchedSeries::RawRecords(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    const PRICES: &str = "date,ticker,close
2024-01-02,tcs.ns,3790.5
2024-01-02,INFY.NS,1580.0
2024-01-03,TCS.NS,3801.0
2024-01-03,INFY.NS,1592.4
";

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_records_grouped_by_normalized_ticker() {
        let source = CsvFileSource::from_reader(PRICES.as_bytes()).unwrap();
        let tcs = Ticker::parse("TCS.NS").unwrap();
        let column = source
            .close_prices(&tcs, &range())
            .unwrap()
            .into_column(&range())
            .unwrap();
        assert_eq!(column.closes, vec![3790.5, 3801.0]);
    }

    #[test]
    fn test_unknown_ticker_is_unsupported() {
        let source = CsvFileSource::from_reader(PRICES.as_bytes()).unwrap();
        let result = source.close_prices(&Ticker::parse("RELIANCE.NS").unwrap(), &range());
        assert!(matches!(result, Err(FetchError::UnsupportedTicker { .. })));
    }

    #[test]
    fn test_bad_date_fails_load() {
        let bad = "date,ticker,close\nnot-a-date,TCS.NS,1.0\n";
        assert!(CsvFileSource::from_reader(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_bad_close_fails_load() {
        let bad = "date,ticker,close\n2024-01-02,TCS.NS,n/a\n";
        assert!(CsvFileSource::from_reader(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_open_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PRICES.as_bytes()).unwrap();
        let source = CsvFileSource::open(file.path()).unwrap();
        let tickers = source.tickers().unwrap();
        assert_eq!(
            tickers,
            vec![
                Ticker::parse("INFY.NS").unwrap(),
                Ticker::parse("TCS.NS").unwrap()
            ]
        );
    }
}
