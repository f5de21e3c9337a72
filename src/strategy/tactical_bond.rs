use crate::error::Result;
use crate::models::{BondMode, PriceTable, RateRegime};

/// Whether a tracked instrument's states move on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Evaluate today's transition
    Advance,
    /// Copy yesterday's states forward unchanged
    Hold,
}

/// Per-day advance-or-hold schedule of a tracked instrument
#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    Always,
    /// Advances only on days flagged `true`
    ActiveOn(Vec<bool>),
}

impl Activity {
    pub fn step(&self, day: usize) -> Step {
        match self {
            Activity::Always => Step::Advance,
            Activity::ActiveOn(days) if days.get(day).copied().unwrap_or(false) => Step::Advance,
            Activity::ActiveOn(_) => Step::Hold,
        }
    }
}

/// A price series that gets its own bands and hysteresis states
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTrack {
    pub instrument: String,
    pub prices: Vec<f64>,
    pub activity: Activity,
}

impl PriceTrack {
    pub fn always(instrument: impl Into<String>, prices: Vec<f64>) -> Self {
        Self {
            instrument: instrument.into(),
            prices,
            activity: Activity::Always,
        }
    }
}

/// Which track a strategic asset reads its score from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    Track(usize),
    RegimeSwitched { rising: usize, falling: usize },
}

impl Backing {
    pub fn track_for(self, regime: RateRegime) -> usize {
        match self {
            Backing::Track(index) => index,
            Backing::RegimeSwitched { rising, falling } => {
                if regime.is_rising() {
                    rising
                } else {
                    falling
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetBinding {
    pub asset: String,
    pub backing: Backing,
}

/// Tracks and asset bindings handed to the state engine
#[derive(Debug, Clone, PartialEq)]
pub struct SignalUniverse {
    pub tracks: Vec<PriceTrack>,
    pub bindings: Vec<AssetBinding>,
    /// One-day return of the tactical bond, `None` on the first day
    pub bond_returns: Vec<Option<f64>>,
}

/// Identifiers of the tactical bond asset and its two underlying instruments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondLegs {
    pub asset: String,
    pub rising: String,
    pub falling: String,
}

impl BondLegs {
    pub fn active(&self, regime: RateRegime) -> &str {
        if regime.is_rising() {
            &self.rising
        } else {
            &self.falling
        }
    }
}

/// Supplies the tactical bond exposure to the state engine
///
/// Implementations decide which price series are tracked and how the bond
/// asset maps onto them; the engine never needs to know which one it got.
pub trait TacticalBondBuilder: Send + Sync {
    fn mode(&self) -> BondMode;

    /// Build tracks for `assets` (in order); every asset other than the bond
    /// asset is backed by the instrument with the same identifier
    fn build(
        &self,
        table: &PriceTable,
        assets: &[String],
        regimes: &[RateRegime],
    ) -> Result<SignalUniverse>;
}

/// Select the builder for a configured mode
pub fn builder_for(mode: BondMode, legs: BondLegs) -> Box<dyn TacticalBondBuilder> {
    match mode {
        BondMode::PriceSplice => Box::new(PriceSplice::new(legs)),
        BondMode::RealAsset => Box::new(RealAsset::new(legs)),
    }
}

/// Splices the two instruments' prices into one synthetic series
///
/// The spliced series gets its own moving averages, so the average can jump
/// when the regime switches the backing instrument. That jump is kept.
#[derive(Debug, Clone)]
pub struct PriceSplice {
    legs: BondLegs,
}

impl PriceSplice {
    pub fn new(legs: BondLegs) -> Self {
        Self { legs }
    }

    pub fn splice(rising: &[f64], falling: &[f64], regimes: &[RateRegime]) -> Vec<f64> {
        regimes
            .iter()
            .zip(rising.iter().zip(falling))
            .map(|(regime, (&r, &f))| if regime.is_rising() { r } else { f })
            .collect()
    }
}

impl TacticalBondBuilder for PriceSplice {
    fn mode(&self) -> BondMode {
        BondMode::PriceSplice
    }

    fn build(
        &self,
        table: &PriceTable,
        assets: &[String],
        regimes: &[RateRegime],
    ) -> Result<SignalUniverse> {
        let rising = table.prices(&self.legs.rising)?;
        let falling = table.prices(&self.legs.falling)?;
        let spliced = Self::splice(rising, falling, regimes);
        let bond_returns = daily_returns(&spliced);

        let mut tracks = Vec::with_capacity(assets.len());
        let mut bindings = Vec::with_capacity(assets.len());
        for asset in assets {
            let prices = if *asset == self.legs.asset {
                spliced.clone()
            } else {
                table.prices(asset)?.to_vec()
            };
            bindings.push(AssetBinding {
                asset: asset.clone(),
                backing: Backing::Track(tracks.len()),
            });
            tracks.push(PriceTrack::always(asset.clone(), prices));
        }

        Ok(SignalUniverse {
            tracks,
            bindings,
            bond_returns,
        })
    }
}

/// Tracks both real bond instruments and holds the inactive one
///
/// Each leg advances only on days its regime is active; on other days its
/// window states are carried forward verbatim.
#[derive(Debug, Clone)]
pub struct RealAsset {
    legs: BondLegs,
}

impl RealAsset {
    pub fn new(legs: BondLegs) -> Self {
        Self { legs }
    }
}

impl TacticalBondBuilder for RealAsset {
    fn mode(&self) -> BondMode {
        BondMode::RealAsset
    }

    fn build(
        &self,
        table: &PriceTable,
        assets: &[String],
        regimes: &[RateRegime],
    ) -> Result<SignalUniverse> {
        let rising = table.prices(&self.legs.rising)?;
        let falling = table.prices(&self.legs.falling)?;

        let mut tracks = Vec::with_capacity(assets.len() + 1);
        let mut bindings = Vec::with_capacity(assets.len());
        for asset in assets {
            if *asset == self.legs.asset {
                let rising_index = tracks.len();
                tracks.push(PriceTrack {
                    instrument: self.legs.rising.clone(),
                    prices: rising.to_vec(),
                    activity: Activity::ActiveOn(regimes.iter().map(|r| r.is_rising()).collect()),
                });
                tracks.push(PriceTrack {
                    instrument: self.legs.falling.clone(),
                    prices: falling.to_vec(),
                    activity: Activity::ActiveOn(regimes.iter().map(|r| !r.is_rising()).collect()),
                });
                bindings.push(AssetBinding {
                    asset: asset.clone(),
                    backing: Backing::RegimeSwitched {
                        rising: rising_index,
                        falling: rising_index + 1,
                    },
                });
            } else {
                bindings.push(AssetBinding {
                    asset: asset.clone(),
                    backing: Backing::Track(tracks.len()),
                });
                tracks.push(PriceTrack::always(asset.clone(), table.prices(asset)?.to_vec()));
            }
        }

        let rising_returns = daily_returns(rising);
        let falling_returns = daily_returns(falling);
        let bond_returns = regimes
            .iter()
            .enumerate()
            .map(|(day, regime)| {
                if regime.is_rising() {
                    rising_returns[day]
                } else {
                    falling_returns[day]
                }
            })
            .collect();

        Ok(SignalUniverse {
            tracks,
            bindings,
            bond_returns,
        })
    }
}

/// Percentage change from the previous day
pub fn daily_returns(prices: &[f64]) -> Vec<Option<f64>> {
    std::iter::once(None)
        .chain(prices.windows(2).map(|pair| Some(pair[1] / pair[0] - 1.0)))
        .take(prices.len())
        .collect()
}
