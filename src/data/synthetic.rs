use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use crate::error::Result;
use crate::models::PriceTable;

/// Market scenario types for synthetic price tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    /// Steady uptrend across risk assets (+0.1% daily equity drift)
    Uptrend,
    /// Steady downtrend across risk assets (-0.1% daily equity drift)
    Downtrend,
    /// Mean-reverting prices around their starting level
    Sideways,
    /// Large daily swings (±3%)
    Volatile,
    /// Rates climb for the first half, then fall; bonds move the other way
    RateFlip,
}

impl MarketScenario {
    pub const ALL: [MarketScenario; 5] = [
        MarketScenario::Uptrend,
        MarketScenario::Downtrend,
        MarketScenario::Sideways,
        MarketScenario::Volatile,
        MarketScenario::RateFlip,
    ];
}

/// Starting level of each generated instrument
const BASES: [(&str, f64); 5] = [
    ("QQQ", 400.0),
    ("GLD", 180.0),
    ("IEF", 95.0),
    ("TLT", 90.0),
    ("^TNX", 4.0),
];

/// Generates dense daily price tables for demos and tests
pub struct SyntheticPriceGenerator {
    rng: StdRng,
    start: NaiveDate,
}

impl SyntheticPriceGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            start: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or(NaiveDate::MIN),
        }
    }

    /// Generate `days` business days of closes for QQQ, GLD, IEF, TLT and ^TNX
    pub fn generate(&mut self, scenario: MarketScenario, days: usize) -> Result<PriceTable> {
        let dates = business_days(self.start, days);
        let mut series = HashMap::new();

        for (instrument, base) in BASES {
            let prices = match (scenario, instrument) {
                (MarketScenario::RateFlip, "^TNX") => self.flip(base, days, 0.01, 0.005),
                (MarketScenario::RateFlip, "IEF") => self.flip(base, days, -0.05, 0.05),
                (MarketScenario::RateFlip, "TLT") => self.flip(base, days, -0.12, 0.1),
                (MarketScenario::RateFlip, _) => self.trend(base, days, 0.0003, 0.005),
                (MarketScenario::Uptrend, "^TNX") | (MarketScenario::Downtrend, "^TNX") => {
                    self.sideways(base, days, 0.01)
                }
                (MarketScenario::Uptrend, _) => {
                    self.trend(base, days, 0.001 * risk(instrument), 0.005)
                }
                (MarketScenario::Downtrend, _) => {
                    self.trend(base, days, -0.001 * risk(instrument), 0.005)
                }
                (MarketScenario::Sideways, _) => self.sideways(base, days, 0.01),
                (MarketScenario::Volatile, _) => self.volatile(base, days, 0.03),
            };
            series.insert(instrument.to_string(), prices);
        }

        PriceTable::new(dates, series)
    }

    /// Proportional drift plus uniform noise
    fn trend(&mut self, base: f64, days: usize, drift: f64, noise: f64) -> Vec<f64> {
        let mut price = base;
        (0..days)
            .map(|_| {
                price *= 1.0 + drift + self.rng.gen_range(-noise..noise);
                price
            })
            .collect()
    }

    /// Mean reversion force + noise
    fn sideways(&mut self, base: f64, days: usize, noise: f64) -> Vec<f64> {
        let mut price = base;
        (0..days)
            .map(|_| {
                let reversion = (base - price) * 0.1;
                price += reversion + price * self.rng.gen_range(-noise..noise);
                price
            })
            .collect()
    }

    /// Large random moves, floored at half the starting level
    fn volatile(&mut self, base: f64, days: usize, swing: f64) -> Vec<f64> {
        let mut price = base;
        (0..days)
            .map(|_| {
                price += price * self.rng.gen_range(-swing..swing);
                price = price.max(base * 0.5);
                price
            })
            .collect()
    }

    /// Additive step `slope` for the first half, `-slope` for the second
    fn flip(&mut self, base: f64, days: usize, slope: f64, noise: f64) -> Vec<f64> {
        let mut level = base;
        (0..days)
            .map(|day| {
                let direction = if day < days / 2 { 1.0 } else { -1.0 };
                level += direction * slope + self.rng.gen_range(-noise..noise);
                level = level.max(base * 0.1);
                level
            })
            .collect()
    }
}

/// Relative drift of each instrument in trending scenarios
fn risk(instrument: &str) -> f64 {
    match instrument {
        "QQQ" => 1.0,
        "GLD" => 0.5,
        _ => 0.2,
    }
}

/// Weekdays starting at `start` (inclusive)
pub fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut current = start;
    while dates.len() < count {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(current);
        }
        current = current + Days::new(1);
    }
    dates
}
