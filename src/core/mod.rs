//! Rate acquisition, caching and history core

pub mod calc;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod history;
pub mod log;
pub mod rate;
pub mod rate_cache;
pub mod session;
pub mod store;

// Re-export main types for cleaner imports
pub use calc::Calculation;
pub use history::{CalculationEntry, HistoryLog, HistoryStore};
pub use rate::{MarketRate, MarketRateProvider, RateSnapshot, RateStatus};
pub use session::{Intent, Outcome, Session};
pub use store::KeyValueStore;
