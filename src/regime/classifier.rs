//! Rate Regime Classifier using a trailing moving average
//!
//! Classifies every day of a reference rate series:
//! - Rising: rate strictly above its own N-day SMA
//! - Falling: rate at or below the SMA, or the SMA is not yet defined

use crate::indicators::rolling_sma;
use crate::models::RateRegime;

#[derive(Debug, Clone, Copy)]
pub struct RegimeClassifier {
    window: usize,
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self { window: 200 }
    }
}

impl RegimeClassifier {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Regime for every date of `rates`, aligned index-for-index
    pub fn classify(&self, rates: &[f64]) -> Vec<RateRegime> {
        rates
            .iter()
            .zip(rolling_sma(rates, self.window))
            .map(|(&rate, average)| match average {
                Some(avg) if rate > avg => RateRegime::Rising,
                // Warm-up resolves to falling
                _ => RateRegime::Falling,
            })
            .collect()
    }
}
