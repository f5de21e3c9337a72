use serde::{Deserialize, Serialize};

use crate::settings::AssetWeight;

/// One strategic asset's share of the portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedWeight {
    pub asset: String,
    pub base_weight: f64,
    pub scalar: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetWeights {
    pub assets: Vec<AllocatedWeight>,
    pub cash: f64,
}

impl TargetWeights {
    pub fn invested(&self) -> f64 {
        self.assets.iter().map(|a| a.weight).sum()
    }

    pub fn weight(&self, asset: &str) -> Option<f64> {
        self.assets.iter().find(|a| a.asset == asset).map(|a| a.weight)
    }
}

/// Scales base weights by their scalars; whatever is left is cash
///
/// No clamping: with base weights summing to at most 1 and scalars in
/// [0, 1], cash cannot go negative.
#[derive(Debug, Clone)]
pub struct WeightCalculator {
    base_weights: Vec<AssetWeight>,
}

impl WeightCalculator {
    pub fn new(base_weights: Vec<AssetWeight>) -> Self {
        Self { base_weights }
    }

    /// `scalars` follow the order of the base weights
    pub fn allocate(&self, scalars: &[f64]) -> TargetWeights {
        let assets: Vec<AllocatedWeight> = self
            .base_weights
            .iter()
            .zip(scalars)
            .map(|(base, &scalar)| AllocatedWeight {
                asset: base.id.clone(),
                base_weight: base.weight,
                scalar,
                weight: base.weight * scalar,
            })
            .collect();

        let cash = 1.0 - assets.iter().map(|a| a.weight).sum::<f64>();
        TargetWeights { assets, cash }
    }
}
