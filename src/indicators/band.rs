use serde::{Deserialize, Serialize};

use super::moving_average::rolling_sma;

/// Moving average with a symmetric percentage envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingAverageBand {
    pub center: f64,
    pub upper: f64,
    pub lower: f64,
}

impl MovingAverageBand {
    pub fn new(center: f64, band_fraction: f64) -> Self {
        Self {
            center,
            upper: center * (1.0 + band_fraction),
            lower: center * (1.0 - band_fraction),
        }
    }
}

/// Computes moving-average envelopes for a price series
///
/// Stateless: every band depends only on the trailing window of prices,
/// so the full history can be banded ahead of the state replay.
#[derive(Debug, Clone, Copy)]
pub struct BandCalculator {
    band_fraction: f64,
}

impl BandCalculator {
    pub fn new(band_fraction: f64) -> Self {
        Self { band_fraction }
    }

    /// Band for every day; `None` while fewer than `window` prices exist
    pub fn band_series(&self, prices: &[f64], window: usize) -> Vec<Option<MovingAverageBand>> {
        rolling_sma(prices, window)
            .into_iter()
            .map(|center| center.map(|c| MovingAverageBand::new(c, self.band_fraction)))
            .collect()
    }

    /// One band series per window, in the order given
    pub fn compute(
        &self,
        prices: &[f64],
        windows: &[usize],
    ) -> Vec<Vec<Option<MovingAverageBand>>> {
        windows
            .iter()
            .map(|&window| self.band_series(prices, window))
            .collect()
    }
}
