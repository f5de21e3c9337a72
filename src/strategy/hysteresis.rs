//! Hysteresis state engine
//!
//! Replays every trading day in order, holding one ON/OFF state per
//! (instrument, window) pair. A pair turns ON only when the price closes
//! strictly above the upper band and turns OFF only when it closes
//! strictly below the lower band; between the bands it keeps yesterday's
//! state. Each day's states depend on the previous day's, so the replay
//! is a single forward fold over the date index.

use crate::error::{Result, SignalError};
use crate::indicators::{BandCalculator, MovingAverageBand};
use crate::models::BandState;

use super::tactical_bond::{Activity, PriceTrack, Step};

/// Next state of one pair given yesterday's state and today's close
pub fn transition(
    previous: BandState,
    price: f64,
    band: Option<&MovingAverageBand>,
) -> BandState {
    let Some(band) = band else {
        // No band, no signal: stale state is never carried through a gap
        return BandState::Off;
    };

    let on = match previous {
        BandState::On => price >= band.lower,
        BandState::Off => price > band.upper,
    };

    if on {
        BandState::On
    } else {
        BandState::Off
    }
}

/// States of every tracked pair on one day, indexed `[track][window]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVector(Vec<Vec<BandState>>);

impl StateVector {
    pub fn off(tracks: usize, windows: usize) -> Self {
        Self(vec![vec![BandState::Off; windows]; tracks])
    }

    pub fn track(&self, index: usize) -> &[BandState] {
        &self.0[index]
    }

    pub fn tracks(&self) -> impl Iterator<Item = &[BandState]> {
        self.0.iter().map(Vec::as_slice)
    }
}

/// States computed for one day
#[derive(Debug, Clone, PartialEq)]
pub struct DayStates {
    pub day: usize,
    pub states: StateVector,
}

/// The two snapshots kept from a full replay
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    pub yesterday: DayStates,
    pub today: DayStates,
}

/// A track with its bands precomputed for every window
#[derive(Debug, Clone)]
pub struct BandedTrack {
    pub instrument: String,
    pub prices: Vec<f64>,
    /// `[window][day]`
    pub bands: Vec<Vec<Option<MovingAverageBand>>>,
    pub activity: Activity,
}

#[derive(Debug, Clone)]
pub struct HysteresisEngine {
    windows: Vec<usize>,
    tracks: Vec<BandedTrack>,
    days: usize,
}

impl HysteresisEngine {
    pub fn new(tracks: Vec<PriceTrack>, windows: &[usize], calculator: BandCalculator) -> Self {
        let days = tracks.iter().map(|t| t.prices.len()).min().unwrap_or(0);
        let tracks = tracks
            .into_iter()
            .map(|track| BandedTrack {
                bands: calculator.compute(&track.prices, windows),
                instrument: track.instrument,
                prices: track.prices,
                activity: track.activity,
            })
            .collect();

        Self {
            windows: windows.to_vec(),
            tracks,
            days,
        }
    }

    pub fn windows(&self) -> &[usize] {
        &self.windows
    }

    pub fn tracks(&self) -> &[BandedTrack] {
        &self.tracks
    }

    pub fn days(&self) -> usize {
        self.days
    }

    /// First day on which every window has enough history
    pub fn start_index(&self) -> usize {
        self.windows.iter().max().copied().unwrap_or(1).saturating_sub(1)
    }

    /// States on `day` given the states of the day before
    pub fn step(&self, day: usize, previous: &StateVector) -> StateVector {
        StateVector(
            self.tracks
                .iter()
                .zip(previous.tracks())
                .map(|(track, prev)| match track.activity.step(day) {
                    Step::Hold => prev.to_vec(),
                    Step::Advance => track
                        .bands
                        .iter()
                        .zip(prev)
                        .map(|(bands, &state)| {
                            transition(state, track.prices[day], bands[day].as_ref())
                        })
                        .collect(),
                })
                .collect(),
        )
    }

    /// Lazily replay every day from the start index onward
    pub fn snapshots(&self) -> impl Iterator<Item = DayStates> + '_ {
        let initial = StateVector::off(self.tracks.len(), self.windows.len());
        (self.start_index()..self.days).scan(initial, move |previous, day| {
            let states = self.step(day, previous);
            *previous = states.clone();
            Some(DayStates { day, states })
        })
    }

    /// Replay the full history, keeping only the last two days
    pub fn replay(&self) -> Result<Replay> {
        let (yesterday, today) = self
            .snapshots()
            .fold((None, None), |(_, today), snapshot| (today, Some(snapshot)));

        match (yesterday, today) {
            (Some(yesterday), Some(today)) => Ok(Replay { yesterday, today }),
            _ => Err(SignalError::InsufficientHistory {
                required: self.start_index() + 2,
                available: self.days,
            }),
        }
    }
}
