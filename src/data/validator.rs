use std::collections::HashSet;

use crate::error::{Result, SignalError};
use crate::models::PriceTable;

/// Validates closing prices for sanity before they reach the pipeline
#[derive(Debug, Clone, Default)]
pub struct PriceValidator {
    /// Series that may legitimately be zero or negative (e.g. yields)
    signed_series: HashSet<String>,
}

impl PriceValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow zero or negative values for `instrument`
    pub fn allow_signed(mut self, instrument: impl Into<String>) -> Self {
        self.signed_series.insert(instrument.into());
        self
    }

    /// Validate every value in the table
    pub fn validate(&self, table: &PriceTable) -> Result<()> {
        for instrument in table.instruments() {
            let prices = table.prices(instrument)?;
            for (date, &value) in table.dates().iter().zip(prices) {
                if !self.is_valid(instrument, value) {
                    return Err(SignalError::InvalidPrice {
                        instrument: instrument.to_string(),
                        date: *date,
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    fn is_valid(&self, instrument: &str, value: f64) -> bool {
        value.is_finite() && (value > 0.0 || self.signed_series.contains(instrument))
    }
}
