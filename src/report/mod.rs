// Report artifacts written to disk after a run.

pub mod chart;
pub mod pdf;

pub use chart::render_value_chart;
pub use pdf::render_pdf_report;

use log::info;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::display::format_report_saved;
use crate::error::Result;
use crate::simulation::SimulationRun;

pub const PRICES_CSV: &str = "prices.csv";
pub const VALUES_CSV: &str = "portfolio_values.csv";
pub const SUMMARY_JSON: &str = "summary.json";
pub const VALUES_SVG: &str = "portfolio_values.svg";
pub const PDF_REPORT: &str = "Portfolio_Analysis_Report.pdf";

/// File-name friendly form of a portfolio name: `Initial Portfolio` -> `initial_portfolio`.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(df)?;
    Ok(())
}

/// Save every artifact of `run` under `output_dir`, creating it if needed.
/// Returns the written paths in write order.
pub fn save_all_reports(run: &SimulationRun, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    // Holdings per portfolio
    for portfolio in &run.portfolios {
        let path = output_dir.join(format!("holdings_{}.csv", slug(portfolio.name())));
        write_csv(&mut portfolio.holdings_frame()?, &path)?;
        written.push(path);
    }

    // Fetched closes, before any stress
    if let Some(initial) = run.portfolios.first() {
        let path = output_dir.join(PRICES_CSV);
        write_csv(&mut initial.prices().to_dataframe()?, &path)?;
        written.push(path);
    }

    // Value table
    let path = output_dir.join(VALUES_CSV);
    write_csv(&mut run.value_frame()?, &path)?;
    written.push(path);

    // Summary as JSON
    let path = output_dir.join(SUMMARY_JSON);
    let json = serde_json::to_string_pretty(&run.summary()?)?;
    fs::write(&path, json)?;
    written.push(path);

    // Combined chart
    let mut series = Vec::with_capacity(run.portfolios.len());
    for portfolio in &run.portfolios {
        series.push((portfolio.name(), portfolio.value_series()?));
    }
    let path = output_dir.join(VALUES_SVG);
    fs::write(&path, render_value_chart(&series))?;
    written.push(path);

    // PDF
    let path = output_dir.join(PDF_REPORT);
    fs::write(&path, render_pdf_report(run)?)?;
    written.push(path);

    for path in &written {
        info!("{}", format_report_saved(path));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Initial Portfolio"), "initial_portfolio");
        assert_eq!(slug("  Stress -- Test! "), "stress_test");
    }
}
