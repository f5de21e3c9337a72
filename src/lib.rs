// Core modules
pub mod data;
pub mod error;
pub mod indicators;
pub mod models;
pub mod regime;
pub mod settings;
pub mod strategy;

// Re-export commonly used types
pub use error::{Result, SignalError};
pub use models::*;
pub use settings::StrategySettings;
pub use strategy::compute_signals;
