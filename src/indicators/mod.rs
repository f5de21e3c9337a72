// Technical indicators module
// Moving averages and the percentage envelopes built on them

pub mod band;
pub mod moving_average;

pub use band::{BandCalculator, MovingAverageBand};
pub use moving_average::{calculate_sma, rolling_sma};
