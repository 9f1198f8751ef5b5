use chrono::NaiveDate;
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

use stress_sim::config::{ExecutionMode, SimulationConfig, TargetMode};
use stress_sim::display::{self, NOTHING_TO_DISPLAY};
use stress_sim::error::SimError;
use stress_sim::rebalance::{RebalancePolicy, DEFAULT_REBALANCE_THRESHOLD};
use stress_sim::report::save_all_reports;
use stress_sim::simulation::{run_simulation, RunParameters};

/// Stress-test a stock portfolio: apply a uniform price shock and rebalance
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Comma-separated tickers
    #[arg(short, long, default_value = "TCS.NS,INFY.NS,RELIANCE.NS")]
    tickers: String,

    /// Start date (YYYY-MM-DD)
    #[arg(long, default_value = "2023-01-01")]
    start: NaiveDate,

    /// End date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Share counts as TICKER=N pairs; unlisted tickers hold 10 shares
    #[arg(short, long)]
    shares: Option<String>,

    /// Fractional price drop applied to every close, within [0, 1]
    #[arg(short = 'f', long = "stress", default_value_t = 0.1)]
    stress: f64,

    /// Drift beyond which a ticker is reset to its target weight
    #[arg(long, default_value_t = DEFAULT_REBALANCE_THRESHOLD)]
    threshold: f64,

    /// Rebalance target: 'custom' (share weights) or 'equal'
    #[arg(long, default_value = "custom")]
    target: TargetMode,

    /// Renormalize rebalanced weights to sum to one
    #[arg(long)]
    renormalize: bool,

    /// Execution mode: 'production' (Yahoo), 'testing' (CSV prices), 'demo' (synthetic)
    #[arg(short, long, default_value = "demo")]
    mode: ExecutionMode,

    /// Price file for testing mode (date,ticker,close)
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Seed for synthetic demo prices
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Base directory (defaults to $STRESS_SIM_HOME or the current directory)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Override the dated testing output folder suffix
    #[arg(short, long)]
    output_suffix: Option<String>,

    /// Fetch tickers in parallel
    #[arg(long)]
    parallel: bool,

    /// Skip writing CSV, JSON, SVG and PDF reports
    #[arg(long)]
    no_report: bool,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn build_config(args: &Args) -> Result<SimulationConfig, SimError> {
    let mut config = SimulationConfig::new(
        args.path.clone(),
        args.mode,
        &args.tickers,
        args.shares.as_deref(),
        args.start,
        args.end,
        args.stress,
        args.threshold,
        args.output_suffix.clone(),
    )?;
    config.target = args.target;
    if args.renormalize {
        config.policy = RebalancePolicy::Renormalize;
    }
    config.price_file = args.prices.clone();
    config.seed = args.seed;
    config.parallel = args.parallel;
    Ok(config)
}

fn run(args: &Args) -> Result<(), SimError> {
    let config = build_config(args)?;
    info!(
        "Stress simulation: {} tickers, stress {:.2}, threshold {:.4}, mode {:?}",
        config.tickers.len(),
        config.stress_factor,
        config.threshold,
        config.mode
    );
    let source = config.source()?;
    let result = run_simulation(&RunParameters::from(&config), source.as_ref())?;
    display::print_run(&result)?;

    if args.no_report {
        info!("Skipping report artifacts");
        return Ok(());
    }
    let written = save_all_reports(&result, &config.output_dir())?;
    println!(
        "\nWrote {} report files to {}",
        written.len(),
        config.output_dir().display()
    );
    Ok(())
}

fn main() {
    let args = Args::parse();

    // Setup logging based on verbosity
    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .init();

    match run(&args) {
        Ok(()) => {}
        Err(SimError::EmptyResult { failures }) => {
            display::print_failures(&failures);
            warn!("No ticker returned usable prices");
            println!("{}", NOTHING_TO_DISPLAY);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
