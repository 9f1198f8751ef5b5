// Display and formatting utilities for simulator console output

use polars::prelude::DataFrame;

use crate::error::{FetchFailure, Result};
use crate::rebalance::DriftRow;
use crate::simulation::SimulationRun;
use crate::types::Portfolio;

pub const NOTHING_TO_DISPLAY: &str = "No portfolio data to display.";

/// Format the one-line result of a batch fetch
pub fn format_fetch_summary(ok: usize, failed: usize) -> String {
    if failed == 0 {
        format!("Fetched {} tickers", ok)
    } else {
        format!("Fetched {} tickers, {} failed", ok, failed)
    }
}

/// Format message for a ticker that could not be fetched
pub fn format_fetch_failure(failure: &FetchFailure) -> String {
    failure.to_string()
}

/// Format the heading printed above a portfolio's holdings
pub fn format_portfolio_heading(portfolio: &Portfolio) -> String {
    format!("\n{}:", portfolio.name())
}

/// Format one drift row as `TICKER  current -> target (drift) [action]`
pub fn format_drift_row(row: &DriftRow) -> String {
    format!(
        "  {:<14} {:>7.2}% -> {:>7.2}%  drift {:>+7.2}%  {}",
        row.ticker.as_str(),
        row.current * 100.0,
        row.target * 100.0,
        row.drift * 100.0,
        if row.snapped { "rebalance" } else { "hold" }
    )
}

/// Format message for a written report artifact
pub fn format_report_saved(path: &std::path::Path) -> String {
    format!("Report saved: {}", path.display())
}

/// Print holdings of every portfolio, the value table, drift and failures
pub fn print_run(run: &SimulationRun) -> Result<()> {
    if run.portfolios.is_empty() {
        println!("{}", NOTHING_TO_DISPLAY);
        return Ok(());
    }

    println!("Date Range: {}", run.range);
    for portfolio in &run.portfolios {
        println!("{}", format_portfolio_heading(portfolio));
        print_frame(&portfolio.holdings_frame()?);
    }

    println!("\nPortfolio Values:");
    print_frame(&run.value_frame()?);

    if !run.drift.is_empty() {
        println!(
            "\nRebalance (threshold {:.2}%, {:?}):",
            run.threshold * 100.0,
            run.policy
        );
        for row in &run.drift {
            println!("{}", format_drift_row(row));
        }
    }

    print_failures(&run.failures);
    Ok(())
}

/// Print every fetch failure on stderr
pub fn print_failures(failures: &[FetchFailure]) {
    for failure in failures {
        eprintln!("{}", format_fetch_failure(failure));
    }
}

fn print_frame(df: &DataFrame) {
    println!("{}", df);
}
