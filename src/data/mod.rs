// Price table ingestion: CSV loading, sanity checks and synthetic tables
pub mod loader;
pub mod synthetic;
pub mod validator;

pub use loader::{forward_fill, load_csv, read_prices, LoadReport};
pub use synthetic::{MarketScenario, SyntheticPriceGenerator};
pub use validator::PriceValidator;
