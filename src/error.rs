use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by the signal pipeline
///
/// Input problems (short or incomplete tables) and configuration problems
/// are reported as-is; the pipeline never substitutes a partial result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("Insufficient history: need {required} rows, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Instrument {0} is missing from the price table")]
    MissingInstrument(String),

    #[error("Score {score} for {asset} is not covered by the scalar table")]
    ScoreOutOfRange { score: usize, asset: String },

    #[error("Series {instrument} has {actual} rows, expected {expected}")]
    MisalignedSeries {
        instrument: String,
        expected: usize,
        actual: usize,
    },

    #[error("Price table dates are not strictly increasing")]
    UnorderedDates,

    #[error("Invalid price for {instrument} on {date}: {value}")]
    InvalidPrice {
        instrument: String,
        date: NaiveDate,
        value: f64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SignalError>;
