pub mod fetcher;
pub mod oi_source;
pub mod session;

// Re-exports for convenient access (e.g. `use crate::market_data::MarketDataFetcher`).
pub use fetcher::{attach_pcr, FetchReport, MarketDataFetcher};
pub use oi_source::{
    BrokerHistoricalOi, DisabledHistoricalOi, HistoricalOiProvider, OiChangeFallback,
    RandomPerturbation, ZeroFallback,
};
