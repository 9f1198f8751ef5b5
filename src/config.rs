// Configuration module for the stress simulator
// Contains execution mode enum, path layout and run parameters

use chrono::{Local, NaiveDate};
use log::warn;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::env;

use crate::error::{Result, SimError};
use crate::fetch::{CsvFileSource, MarketDataSource, SyntheticSource, YahooSource};
use crate::rebalance::RebalancePolicy;
use crate::types::{DateRange, Ticker};

/// Environment variable naming the base directory
pub const HOME_ENV: &str = "STRESS_SIM_HOME";

/// Share count used for tickers without an explicit entry
pub const DEFAULT_SHARES: i64 = 10;

/// Execution mode: decides where prices come from and where reports go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Production,
    Testing,
    Demo,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "production" => Ok(Self::Production),
            "testing" => Ok(Self::Testing),
            "demo" => Ok(Self::Demo),
            _ => Err(format!("Unknown mode: {}", s)),
        }
    }
}

impl ExecutionMode {
    /// Get the folder name for this mode (with date suffix for testing)
    pub fn folder_name(&self) -> String {
        match self {
            Self::Production => "production".to_string(),
            Self::Testing => {
                let date_suffix = Local::now().format("%Y%m%d").to_string();
                format!("testing_{}", date_suffix)
            }
            Self::Demo => "demo".to_string(),
        }
    }

    /// Check if this is testing mode
    pub fn is_testing(&self) -> bool {
        matches!(self, Self::Testing)
    }
}

/// How the rebalance target is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    /// Target the share-count weights the portfolio started with
    #[default]
    Custom,
    /// Target equal allocation across surviving tickers
    Equal,
}

impl FromStr for TargetMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "custom" => Ok(Self::Custom),
            "equal" => Ok(Self::Equal),
            _ => Err(format!("Unknown target: {}", s)),
        }
    }
}

/// Path configuration for consistent file/directory access
#[derive(Debug, Clone)]
pub struct PathConfig {
    pub base: PathBuf,
    /// Optional date suffix override for testing mode (e.g., "20260204" -> "testing_20260204")
    pub output_suffix: Option<String>,
}

impl PathConfig {
    pub fn new(base: PathBuf, output_suffix: Option<String>) -> Self {
        Self { base, output_suffix }
    }

    /// Get the folder name for a mode, using the output_suffix override if available
    fn get_folder_name(&self, mode: ExecutionMode) -> String {
        if mode.is_testing() {
            if let Some(ref suffix) = self.output_suffix {
                return format!("testing_{}", suffix);
            }
        }
        mode.folder_name()
    }

    /// Default price file for testing mode
    pub fn price_file(&self) -> PathBuf {
        self.base.join("data").join("prices.csv")
    }

    /// Directory receiving report artifacts for a mode
    pub fn output_dir(&self, mode: ExecutionMode) -> PathBuf {
        self.base.join("reports").join(self.get_folder_name(mode))
    }
}

/// Everything one simulation run needs
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub paths: PathConfig,
    pub mode: ExecutionMode,
    pub tickers: Vec<Ticker>,
    pub shares: HashMap<Ticker, i64>,
    pub range: DateRange,
    pub stress_factor: f64,
    pub threshold: f64,
    pub target: TargetMode,
    pub policy: RebalancePolicy,
    pub price_file: Option<PathBuf>,
    pub seed: u64,
    pub parallel: bool,
}

impl SimulationConfig {
    /// Create configuration from command-line arguments
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        path_arg: Option<PathBuf>,
        mode: ExecutionMode,
        tickers: &str,
        shares: Option<&str>,
        start: NaiveDate,
        end: Option<NaiveDate>,
        stress_factor: f64,
        threshold: f64,
        output_suffix: Option<String>,
    ) -> Result<Self> {
        // Get path from args or environment
        let base = path_arg
            .or_else(|| env::var(HOME_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let tickers = parse_tickers(tickers);
        if tickers.is_empty() {
            return Err(SimError::Config("no tickers given".to_string()));
        }

        let mut share_counts: HashMap<Ticker, i64> = tickers
            .iter()
            .map(|t| (t.clone(), DEFAULT_SHARES))
            .collect();
        if let Some(raw) = shares {
            for (ticker, count) in parse_shares(raw)? {
                if !share_counts.contains_key(&ticker) {
                    warn!("Share count given for {} which is not in the ticker list", ticker);
                    continue;
                }
                share_counts.insert(ticker, count);
            }
        }

        let end = end.unwrap_or_else(|| Local::now().date_naive());
        let range = DateRange::new(start, end)?;

        if !(0.0..=1.0).contains(&stress_factor) {
            return Err(SimError::InvalidStressFactor(stress_factor));
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(SimError::InvalidThreshold(threshold));
        }

        Ok(Self {
            paths: PathConfig::new(base, output_suffix),
            mode,
            tickers,
            shares: share_counts,
            range,
            stress_factor,
            threshold,
            target: TargetMode::default(),
            policy: RebalancePolicy::default(),
            price_file: None,
            seed: 42,
            parallel: false,
        })
    }

    /// Build the market-data source for this run's mode
    pub fn source(&self) -> Result<Box<dyn MarketDataSource>> {
        match self.mode {
            ExecutionMode::Production => Ok(Box::new(YahooSource::new())),
            ExecutionMode::Testing => {
                let path = self
                    .price_file
                    .clone()
                    .unwrap_or_else(|| self.paths.price_file());
                Ok(Box::new(CsvFileSource::open(path)?))
            }
            ExecutionMode::Demo => {
                warn!(
                    "Demo mode: prices are synthetic (seed {}), not market data",
                    self.seed
                );
                Ok(Box::new(SyntheticSource::new(self.seed)))
            }
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.paths.output_dir(self.mode)
    }
}

/// Split comma-separated text into trimmed, upper-cased, unique tickers
pub fn parse_tickers(raw: &str) -> Vec<Ticker> {
    let mut tickers: Vec<Ticker> = Vec::new();
    for ticker in raw.split(',').filter_map(Ticker::parse) {
        if tickers.contains(&ticker) {
            warn!("Ignoring duplicate ticker {}", ticker);
            continue;
        }
        tickers.push(ticker);
    }
    tickers
}

/// Parse `TICKER=N` pairs; every count must be at least 1
pub fn parse_shares(raw: &str) -> Result<Vec<(Ticker, i64)>> {
    raw.split(',')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            let (name, count) = pair
                .split_once('=')
                .ok_or_else(|| SimError::Config(format!("expected TICKER=N, got '{}'", pair.trim())))?;
            let ticker = Ticker::parse(name)
                .ok_or_else(|| SimError::Config(format!("missing ticker in '{}'", pair.trim())))?;
            let count: i64 = count.trim().parse().map_err(|_| {
                SimError::Config(format!("share count for {} is not an integer", ticker))
            })?;
            if count < 1 {
                return Err(SimError::Config(format!(
                    "share count for {} must be at least 1, got {}",
                    ticker, count
                )));
            }
            Ok((ticker, count))
        })
        .collect()
}
