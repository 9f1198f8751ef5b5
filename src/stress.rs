// Uniform market shock applied to a price table.

use log::debug;

use crate::error::{Result, SimError};
use crate::types::PriceTable;

/// Scale every price by `1 - stress_factor`.
///
/// `stress_factor` must lie in `[0, 1]`: zero leaves prices unchanged and one
/// zeroes them. The input table is not modified.
pub fn apply_market_stress(prices: &PriceTable, stress_factor: f64) -> Result<PriceTable> {
    if !(0.0..=1.0).contains(&stress_factor) {
        return Err(SimError::InvalidStressFactor(stress_factor));
    }
    let scale = 1.0 - stress_factor;
    debug!(
        "Applying stress factor {:.4} to {} tickers over {} dates",
        stress_factor,
        prices.tickers().len(),
        prices.len()
    );
    Ok(prices.map_prices(|p| p * scale))
}
