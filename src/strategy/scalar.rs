use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, SignalError};
use crate::models::BandState;

/// One row of the score-to-scalar table as it appears in configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarEntry {
    pub score: usize,
    pub scalar: f64,
}

/// Fixed mapping from signal score to exposure multiplier
///
/// Scores missing from the table are an error, never a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ScalarEntry>", into = "Vec<ScalarEntry>")]
pub struct ScalarTable {
    entries: BTreeMap<usize, f64>,
}

impl ScalarTable {
    /// Build a table from (score, scalar) pairs
    ///
    /// Rejects duplicate scores and scalars outside [0, 1].
    pub fn new(pairs: impl IntoIterator<Item = (usize, f64)>) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (score, scalar) in pairs {
            if !(0.0..=1.0).contains(&scalar) {
                return Err(SignalError::InvalidConfig(format!(
                    "scalar {} for score {} is outside [0, 1]",
                    scalar, score
                )));
            }
            if entries.insert(score, scalar).is_some() {
                return Err(SignalError::InvalidConfig(format!(
                    "score {} appears more than once in the scalar table",
                    score
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn lookup(&self, score: usize) -> Option<f64> {
        self.entries.get(&score).copied()
    }

    /// Scalar for `asset`'s score, failing when the table has no entry
    pub fn scalar_for(&self, asset: &str, score: usize) -> Result<f64> {
        self.lookup(score).ok_or_else(|| SignalError::ScoreOutOfRange {
            score,
            asset: asset.to_string(),
        })
    }

    /// True when every score in `0..=max_score` has an entry
    pub fn covers(&self, max_score: usize) -> bool {
        (0..=max_score).all(|score| self.entries.contains_key(&score))
    }

    /// True when scalars never decrease as the score grows
    pub fn is_monotone(&self) -> bool {
        self.entries
            .values()
            .collect::<Vec<_>>()
            .windows(2)
            .all(|pair| pair[0] <= pair[1])
    }
}

impl Default for ScalarTable {
    fn default() -> Self {
        Self {
            entries: BTreeMap::from([(0, 0.0), (1, 0.5), (2, 0.75), (3, 1.0)]),
        }
    }
}

impl TryFrom<Vec<ScalarEntry>> for ScalarTable {
    type Error = SignalError;

    fn try_from(entries: Vec<ScalarEntry>) -> Result<Self> {
        Self::new(entries.into_iter().map(|e| (e.score, e.scalar)))
    }
}

impl From<ScalarTable> for Vec<ScalarEntry> {
    fn from(table: ScalarTable) -> Self {
        table
            .entries
            .into_iter()
            .map(|(score, scalar)| ScalarEntry { score, scalar })
            .collect()
    }
}

/// Number of windows currently ON
pub fn score(states: &[BandState]) -> usize {
    states.iter().filter(|s| s.is_on()).count()
}
