use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SignalError};

/// Dense table of closing prices sharing one date index
///
/// Every series has exactly one value per date. Gaps are expected to be
/// forward-filled before a table is built (see `data::loader`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawPriceTable")]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    series: HashMap<String, Vec<f64>>,
}

/// Unchecked wire form of a `PriceTable`
#[derive(Deserialize)]
struct RawPriceTable {
    dates: Vec<NaiveDate>,
    series: HashMap<String, Vec<f64>>,
}

impl TryFrom<RawPriceTable> for PriceTable {
    type Error = SignalError;

    fn try_from(raw: RawPriceTable) -> Result<Self> {
        Self::new(raw.dates, raw.series)
    }
}

impl PriceTable {
    /// Build a table, checking that the date index is strictly increasing
    /// and that every series is aligned to it
    pub fn new(dates: Vec<NaiveDate>, series: HashMap<String, Vec<f64>>) -> Result<Self> {
        if dates.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(SignalError::UnorderedDates);
        }

        for (instrument, prices) in &series {
            if prices.len() != dates.len() {
                return Err(SignalError::MisalignedSeries {
                    instrument: instrument.clone(),
                    expected: dates.len(),
                    actual: prices.len(),
                });
            }
        }

        Ok(Self { dates, series })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn contains(&self, instrument: &str) -> bool {
        self.series.contains_key(instrument)
    }

    /// Closing prices for one instrument
    pub fn prices(&self, instrument: &str) -> Result<&[f64]> {
        self.series
            .get(instrument)
            .map(Vec::as_slice)
            .ok_or_else(|| SignalError::MissingInstrument(instrument.to_string()))
    }

    /// Instrument identifiers, sorted
    pub fn instruments(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.series.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Keep only the most recent `rows` rows
    pub fn tail(&self, rows: usize) -> Self {
        let start = self.dates.len().saturating_sub(rows);
        Self {
            dates: self.dates[start..].to_vec(),
            series: self
                .series
                .iter()
                .map(|(id, prices)| (id.clone(), prices[start..].to_vec()))
                .collect(),
        }
    }
}

/// Hysteresis state of one (instrument, window) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BandState {
    On,
    #[default]
    Off,
}

impl BandState {
    pub fn is_on(self) -> bool {
        self == BandState::On
    }
}

impl fmt::Display for BandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandState::On => f.pad("ON"),
            BandState::Off => f.pad("OFF"),
        }
    }
}

/// How a window's state moved between the last two days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowTransition {
    NewOn,
    NewOff,
    Unchanged,
}

impl WindowTransition {
    pub fn between(yesterday: BandState, today: BandState) -> Self {
        match (yesterday, today) {
            (BandState::Off, BandState::On) => WindowTransition::NewOn,
            (BandState::On, BandState::Off) => WindowTransition::NewOff,
            _ => WindowTransition::Unchanged,
        }
    }
}

/// Direction of the reference rate relative to its own moving average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateRegime {
    Rising,
    Falling,
}

impl RateRegime {
    pub fn is_rising(self) -> bool {
        self == RateRegime::Rising
    }
}

/// How the tactical bond asset is backed by its two underlying instruments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BondMode {
    /// One synthetic series spliced from the two instruments' prices
    #[default]
    PriceSplice,
    /// Both real instruments tracked; the inactive one's states are held
    RealAsset,
}

impl fmt::Display for BondMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BondMode::PriceSplice => write!(f, "price-splice"),
            BondMode::RealAsset => write!(f, "real-asset"),
        }
    }
}

impl FromStr for BondMode {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price-splice" | "splice" => Ok(BondMode::PriceSplice),
            "real-asset" | "real" => Ok(BondMode::RealAsset),
            other => Err(SignalError::InvalidConfig(format!(
                "unknown bond mode '{}' (expected price-splice or real-asset)",
                other
            ))),
        }
    }
}

/// One window's view of an asset on a given day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSignal {
    pub window: usize,
    pub state: BandState,
    pub moving_average: Option<f64>,
    /// price / moving average - 1
    pub disparity: Option<f64>,
}

/// Per-window states of one tracked instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentStates {
    pub instrument: String,
    pub states: Vec<BandState>,
}

/// Signal and allocation for one strategic asset on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSignal {
    pub asset: String,
    /// Tracked instrument whose windows produced the score
    pub instrument: String,
    pub price: f64,
    pub score: usize,
    pub scalar: f64,
    pub base_weight: f64,
    pub weight: f64,
    pub windows: Vec<WindowSignal>,
}

/// Everything derived for one of the two reported days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySignal {
    pub date: NaiveDate,
    pub regime: RateRegime,
    /// Real instrument backing the tactical bond on this day
    pub bond_instrument: String,
    pub assets: Vec<AssetSignal>,
    pub cash: f64,
    pub states: Vec<InstrumentStates>,
}

impl DaySignal {
    pub fn asset(&self, id: &str) -> Option<&AssetSignal> {
        self.assets.iter().find(|a| a.asset == id)
    }

    pub fn scalars(&self) -> Vec<f64> {
        self.assets.iter().map(|a| a.scalar).collect()
    }

    pub fn invested(&self) -> f64 {
        self.assets.iter().map(|a| a.weight).sum()
    }

    /// Window states of a tracked instrument, if it is tracked in this run
    pub fn states_of(&self, instrument: &str) -> Option<&[BandState]> {
        self.states
            .iter()
            .find(|s| s.instrument == instrument)
            .map(|s| s.states.as_slice())
    }
}

/// Weight movement of one strategic asset between yesterday and today
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetChange {
    pub asset: String,
    pub scalar_changed: bool,
    pub yesterday_weight: f64,
    pub today_weight: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceSummary {
    pub needed: bool,
    pub changes: Vec<AssetChange>,
    pub yesterday_cash: f64,
    pub today_cash: f64,
    pub cash_delta: f64,
}

/// Last close and one-day change of a referenced instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentQuote {
    pub instrument: String,
    pub close: f64,
    pub change: Option<f64>,
}

/// Output of one full replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub mode: BondMode,
    pub yesterday: DaySignal,
    pub today: DaySignal,
    pub rebalance: RebalanceSummary,
    pub market: Vec<InstrumentQuote>,
    /// Regime-switched one-day return of the tactical bond
    pub bond_return: Option<f64>,
}

impl SignalResult {
    pub fn needs_rebalance(&self) -> bool {
        self.rebalance.needed
    }

    /// Window transitions for the instrument backing `asset` today
    ///
    /// Yesterday's states are read for the same instrument, so a bond
    /// switch compares against that instrument's own previous states.
    pub fn transitions(&self, asset: &str) -> Vec<(usize, WindowTransition)> {
        let Some(today) = self.today.asset(asset) else {
            return Vec::new();
        };
        let yesterday_states = self.yesterday.states_of(&today.instrument);

        today
            .windows
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let before = yesterday_states
                    .and_then(|s| s.get(i).copied())
                    .unwrap_or_default();
                (w.window, WindowTransition::between(before, w.state))
            })
            .collect()
    }
}
