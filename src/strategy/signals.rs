use crate::error::{Result, SignalError};
use crate::indicators::BandCalculator;
use crate::models::{
    AssetSignal, DaySignal, InstrumentQuote, InstrumentStates, PriceTable, RateRegime,
    SignalResult, WindowSignal,
};
use crate::regime::RegimeClassifier;
use crate::settings::StrategySettings;

use super::hysteresis::{DayStates, HysteresisEngine, Replay};
use super::rebalance::summarize;
use super::scalar::score;
use super::tactical_bond::{builder_for, daily_returns, BondLegs, SignalUniverse};
use super::weights::WeightCalculator;

/// Derive today's and yesterday's signals from a dense price table
///
/// `settings` are expected to have passed `StrategySettings::validate`.
/// The whole history is replayed on every call; nothing is cached.
pub fn compute_signals(table: &PriceTable, settings: &StrategySettings) -> Result<SignalResult> {
    for instrument in settings.required_instruments() {
        if !table.contains(instrument) {
            return Err(SignalError::MissingInstrument(instrument.to_string()));
        }
    }

    let required = settings.required_rows();
    if table.len() < required {
        return Err(SignalError::InsufficientHistory {
            required,
            available: table.len(),
        });
    }

    let bond = &settings.tactical_bond;
    let regimes = RegimeClassifier::new(bond.rate_ma_window)
        .classify(table.prices(&bond.rate_instrument)?);

    let builder = builder_for(bond.mode, bond.legs());
    let universe = builder.build(table, &settings.asset_ids(), &regimes)?;

    let engine = HysteresisEngine::new(
        universe.tracks.clone(),
        &settings.windows,
        BandCalculator::new(settings.band_fraction),
    );
    tracing::debug!(
        "Replaying {} days from index {} across {} tracks ({} mode)",
        engine.days(),
        engine.start_index(),
        engine.tracks().len(),
        builder.mode()
    );

    let Replay { yesterday, today } = engine.replay()?;
    let context = DayContext {
        table,
        settings,
        engine: &engine,
        universe: &universe,
        regimes: &regimes,
        legs: bond.legs(),
    };
    let yesterday = context.day_signal(&yesterday)?;
    let today = context.day_signal(&today)?;

    for (previous, current) in yesterday.states.iter().zip(&today.states) {
        for ((window, before), after) in settings
            .windows
            .iter()
            .zip(&previous.states)
            .zip(&current.states)
        {
            if before != after {
                tracing::debug!(
                    "{} {}-day band: {} -> {}",
                    current.instrument,
                    window,
                    before,
                    after
                );
            }
        }
    }

    let rebalance = summarize(&yesterday, &today);
    let market = market_snapshot(table, settings)?;
    let bond_return = universe.bond_returns.last().copied().flatten();

    tracing::info!(
        "Signals for {}: bond -> {}, scores [{}], rebalance {}",
        today.date,
        today.bond_instrument,
        today
            .assets
            .iter()
            .map(|a| format!("{}={}", a.asset, a.score))
            .collect::<Vec<_>>()
            .join(", "),
        if rebalance.needed { "needed" } else { "not needed" }
    );

    Ok(SignalResult {
        mode: bond.mode,
        yesterday,
        today,
        rebalance,
        market,
        bond_return,
    })
}

/// Borrowed inputs needed to turn one day's states into a `DaySignal`
struct DayContext<'a> {
    table: &'a PriceTable,
    settings: &'a StrategySettings,
    engine: &'a HysteresisEngine,
    universe: &'a SignalUniverse,
    regimes: &'a [RateRegime],
    legs: BondLegs,
}

impl DayContext<'_> {
    fn day_signal(&self, snapshot: &DayStates) -> Result<DaySignal> {
        let day = snapshot.day;
        let regime = self.regimes[day];
        let tracks = self.engine.tracks();

        let mut assets = Vec::with_capacity(self.universe.bindings.len());
        for binding in &self.universe.bindings {
            let index = binding.backing.track_for(regime);
            let track = &tracks[index];
            let states = snapshot.states.track(index);
            let price = track.prices[day];

            let score = score(states);
            let scalar = self
                .settings
                .scalar_table
                .scalar_for(&binding.asset, score)?;

            let windows = self
                .engine
                .windows()
                .iter()
                .zip(states)
                .zip(&track.bands)
                .map(|((&window, &state), bands)| {
                    let moving_average = bands[day].map(|b| b.center);
                    WindowSignal {
                        window,
                        state,
                        moving_average,
                        disparity: moving_average.map(|ma| price / ma - 1.0),
                    }
                })
                .collect();

            assets.push(AssetSignal {
                asset: binding.asset.clone(),
                instrument: track.instrument.clone(),
                price,
                score,
                scalar,
                base_weight: 0.0,
                weight: 0.0,
                windows,
            });
        }

        let scalars: Vec<f64> = assets.iter().map(|a| a.scalar).collect();
        let weights = WeightCalculator::new(self.settings.assets.clone()).allocate(&scalars);
        for (asset, allocated) in assets.iter_mut().zip(&weights.assets) {
            asset.base_weight = allocated.base_weight;
            asset.weight = allocated.weight;
        }

        let states = tracks
            .iter()
            .zip(snapshot.states.tracks())
            .map(|(track, states)| InstrumentStates {
                instrument: track.instrument.clone(),
                states: states.to_vec(),
            })
            .collect();

        Ok(DaySignal {
            date: self.table.dates()[day],
            regime,
            bond_instrument: self.legs.active(regime).to_string(),
            assets,
            cash: weights.cash,
            states,
        })
    }
}

/// Last close and one-day change of every referenced instrument
fn market_snapshot(
    table: &PriceTable,
    settings: &StrategySettings,
) -> Result<Vec<InstrumentQuote>> {
    settings
        .required_instruments()
        .into_iter()
        .map(|instrument| {
            let prices = table.prices(instrument)?;
            let close = prices.last().copied().ok_or(SignalError::InsufficientHistory {
                required: settings.required_rows(),
                available: 0,
            })?;
            Ok(InstrumentQuote {
                instrument: instrument.to_string(),
                close,
                change: daily_returns(prices).last().copied().flatten(),
            })
        })
        .collect()
}
