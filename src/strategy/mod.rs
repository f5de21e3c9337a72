// Hysteresis-banded allocation strategy
//
// Data flows one way: regime flags -> tactical bond tracks -> bands ->
// hysteresis replay -> scores and scalars -> weights -> rebalance check.
pub mod hysteresis;
pub mod rebalance;
pub mod scalar;
pub mod signals;
pub mod tactical_bond;
pub mod weights;

pub use hysteresis::{transition, HysteresisEngine, Replay, StateVector};
pub use rebalance::needs_rebalance;
pub use scalar::{ScalarEntry, ScalarTable};
pub use signals::compute_signals;
pub use tactical_bond::{builder_for, BondLegs, PriceSplice, RealAsset, TacticalBondBuilder};
pub use weights::{TargetWeights, WeightCalculator};
