//! Strategy configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `TAA_*` environment variables (nested keys joined with `__`, e.g.
//! `TAA_TACTICAL_BOND__MODE=real-asset`). Validation runs once after load.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Result, SignalError};
use crate::models::BondMode;
use crate::strategy::scalar::ScalarTable;
use crate::strategy::tactical_bond::BondLegs;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Base target weight of a strategic asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetWeight {
    pub id: String,
    pub weight: f64,
}

impl AssetWeight {
    pub fn new(id: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TacticalBondSettings {
    /// Strategic asset id of the bond bucket
    pub asset: String,
    pub rate_instrument: String,
    pub rate_ma_window: usize,
    pub rising_instrument: String,
    pub falling_instrument: String,
    pub mode: BondMode,
}

impl Default for TacticalBondSettings {
    fn default() -> Self {
        Self {
            asset: "Tactical_Bond".to_string(),
            rate_instrument: "^TNX".to_string(),
            rate_ma_window: 200,
            rising_instrument: "IEF".to_string(),
            falling_instrument: "TLT".to_string(),
            mode: BondMode::PriceSplice,
        }
    }
}

impl TacticalBondSettings {
    pub fn legs(&self) -> BondLegs {
        BondLegs {
            asset: self.asset.clone(),
            rising: self.rising_instrument.clone(),
            falling: self.falling_instrument.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    /// Strategic assets in reporting order
    pub assets: Vec<AssetWeight>,
    pub band_fraction: f64,
    pub windows: Vec<usize>,
    pub scalar_table: ScalarTable,
    pub tactical_bond: TacticalBondSettings,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            assets: vec![
                AssetWeight::new("QQQ", 0.45),
                AssetWeight::new("GLD", 0.20),
                AssetWeight::new("Tactical_Bond", 0.35),
            ],
            band_fraction: 0.03,
            windows: vec![20, 120, 200],
            scalar_table: ScalarTable::default(),
            tactical_bond: TacticalBondSettings::default(),
        }
    }
}

impl StrategySettings {
    pub fn max_window(&self) -> usize {
        self.windows.iter().max().copied().unwrap_or(0)
    }

    /// Rows needed for the longest window plus yesterday and today
    pub fn required_rows(&self) -> usize {
        self.max_window() + 2
    }

    pub fn asset_ids(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.id.clone()).collect()
    }

    /// Assets backed directly by the instrument of the same id
    pub fn core_assets(&self) -> impl Iterator<Item = &str> {
        self.assets
            .iter()
            .map(|a| a.id.as_str())
            .filter(move |id| *id != self.tactical_bond.asset)
    }

    /// Every instrument the price table must contain
    pub fn required_instruments(&self) -> Vec<&str> {
        let bond = &self.tactical_bond;
        self.core_assets()
            .chain([
                bond.rising_instrument.as_str(),
                bond.falling_instrument.as_str(),
                bond.rate_instrument.as_str(),
            ])
            .collect()
    }

    /// Check configuration consistency
    pub fn validate(&self) -> Result<()> {
        if self.windows.is_empty() {
            return invalid("at least one window is required");
        }
        if self.windows.contains(&0) {
            return invalid("window lengths must be positive");
        }
        let unique: HashSet<usize> = self.windows.iter().copied().collect();
        if unique.len() != self.windows.len() {
            return invalid("window lengths must be distinct");
        }

        if !(self.band_fraction > 0.0 && self.band_fraction < 1.0) {
            return invalid(format!(
                "band fraction {} must be in (0, 1)",
                self.band_fraction
            ));
        }

        if self.assets.is_empty() {
            return invalid("at least one asset is required");
        }
        let ids: HashSet<&str> = self.assets.iter().map(|a| a.id.as_str()).collect();
        if ids.len() != self.assets.len() {
            return invalid("asset ids must be distinct");
        }
        for asset in &self.assets {
            if !(0.0..=1.0).contains(&asset.weight) {
                return invalid(format!(
                    "weight {} for {} must be in [0, 1]",
                    asset.weight, asset.id
                ));
            }
        }
        let total: f64 = self.assets.iter().map(|a| a.weight).sum();
        if total > 1.0 + WEIGHT_SUM_TOLERANCE {
            return invalid(format!("base weights sum to {:.6}, above 1", total));
        }

        let bond = &self.tactical_bond;
        if !ids.contains(bond.asset.as_str()) {
            return invalid(format!(
                "tactical bond asset {} has no base weight",
                bond.asset
            ));
        }
        if bond.rising_instrument == bond.falling_instrument {
            return invalid("rising and falling bond instruments must differ");
        }
        if bond.rate_ma_window == 0 {
            return invalid("rate moving-average window must be positive");
        }

        if !self.scalar_table.covers(self.windows.len()) {
            return invalid(format!(
                "scalar table must cover every score from 0 to {}",
                self.windows.len()
            ));
        }
        if !self.scalar_table.is_monotone() {
            return invalid("scalar table must be non-decreasing in score");
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Result<()> {
    Err(SignalError::InvalidConfig(message.into()))
}

/// Load settings from defaults, an optional TOML file and `TAA_*` env vars,
/// then validate them
pub fn load(path: Option<&Path>) -> anyhow::Result<StrategySettings> {
    let mut builder = config::Config::builder().add_source(
        config::Config::try_from(&StrategySettings::default())
            .context("Failed to seed default settings")?,
    );

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings: StrategySettings = builder
        .add_source(
            config::Environment::with_prefix("TAA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read settings")?
        .try_deserialize()
        .context("Failed to parse settings")?;

    settings.validate()?;

    tracing::debug!(
        "Loaded settings: {} assets, windows {:?}, band {:.2}%, mode {}",
        settings.assets.len(),
        settings.windows,
        settings.band_fraction * 100.0,
        settings.tactical_bond.mode
    );

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = StrategySettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.required_rows(), 202);
        assert_eq!(
            settings.required_instruments(),
            vec!["QQQ", "GLD", "IEF", "TLT", "^TNX"]
        );
    }

    #[test]
    fn test_weights_above_one_rejected() {
        let mut settings = StrategySettings::default();
        settings.assets[0].weight = 0.60;

        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("above 1"));
    }

    #[test]
    fn test_scalar_table_must_cover_scores() {
        let mut settings = StrategySettings::default();
        settings.windows = vec![20, 60, 120, 200];

        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("cover every score"));
    }

    #[test]
    fn test_non_monotone_table_rejected() {
        let mut settings = StrategySettings::default();
        settings.scalar_table =
            ScalarTable::new([(0, 0.0), (1, 0.75), (2, 0.5), (3, 1.0)]).unwrap();

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_band_fraction_bounds() {
        let mut settings = StrategySettings::default();
        settings.band_fraction = 0.0;
        assert!(settings.validate().is_err());

        settings.band_fraction = 1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_bond_asset_needs_weight() {
        let mut settings = StrategySettings::default();
        settings.tactical_bond.asset = "Bonds".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_duplicate_windows_rejected() {
        let mut settings = StrategySettings::default();
        settings.windows = vec![20, 20, 200];
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
band_fraction = 0.05
windows = [10, 50]

[[scalar_table]]
score = 0
scalar = 0.0

[[scalar_table]]
score = 1
scalar = 0.5

[[scalar_table]]
score = 2
scalar = 1.0

[tactical_bond]
mode = "real-asset"
"#
        )
        .unwrap();

        let settings = load(Some(file.path())).unwrap();
        assert_eq!(settings.band_fraction, 0.05);
        assert_eq!(settings.windows, vec![10, 50]);
        assert_eq!(settings.scalar_table.lookup(2), Some(1.0));
        assert_eq!(settings.tactical_bond.mode, BondMode::RealAsset);
        // Untouched keys keep their defaults
        assert_eq!(settings.tactical_bond.rising_instrument, "IEF");
        assert_eq!(settings.assets.len(), 3);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "band_fraction = 1.5").unwrap();

        assert!(load(Some(file.path())).is_err());
    }
}
