// Reproducible random prices for demos and offline runs.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FetchedSeries, MarketDataSource};
use crate::error::FetchError;
use crate::types::{DateRange, Ticker};

const SOURCE_NAME: &str = "synthetic";
const LOW: f64 = 100.0;
const HIGH: f64 = 150.0;

/// Uniform closes in `[100, 150)` for every calendar day of the range.
///
/// Each ticker gets its own stream derived from the run seed, so a ticker's
/// prices do not depend on which other tickers are requested.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticSource {
    seed: u64,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn ticker_seed(&self, ticker: &Ticker) -> u64 {
        // FNV-1a
        let hash = ticker
            .as_str()
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            });
        self.seed ^ hash
    }
}

impl MarketDataSource for SyntheticSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn close_prices(
        &self,
        ticker: &Ticker,
        range: &DateRange,
    ) -> Result<FetchedSeries, FetchError> {
        let mut rng = StdRng::seed_from_u64(self.ticker_seed(ticker));
        let dates: Vec<_> = range.days().collect();
        let closes = dates.iter().map(|_| Some(rng.gen_range(LOW..HIGH))).collect();
        debug!("Generated {} synthetic closes for {}", dates.len(), ticker);
        Ok(FetchedSeries::TabularColumn { dates, closes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_one_close_per_calendar_day_in_band() {
        let source = SyntheticSource::new(42);
        let column = source
            .close_prices(&Ticker::parse("TCS.NS").unwrap(), &range())
            .unwrap()
            .into_column(&range())
            .unwrap();
        assert_eq!(column.dates.len(), 31);
        assert!(column.closes.iter().all(|c| (LOW..HIGH).contains(c)));
    }

    #[test]
    fn test_same_seed_same_prices() {
        let ticker = Ticker::parse("INFY.NS").unwrap();
        let a = SyntheticSource::new(7).close_prices(&ticker, &range()).unwrap();
        let b = SyntheticSource::new(7).close_prices(&ticker, &range()).unwrap();
        let c = SyntheticSource::new(8).close_prices(&ticker, &range()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
