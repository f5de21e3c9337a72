// Rate regime detection module
pub mod classifier;

pub use classifier::RegimeClassifier;
