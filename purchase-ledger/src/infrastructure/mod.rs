//! Infrastructure layer - adapters for the application ports

pub mod cache;
pub mod clock;
pub mod config;
pub mod rate_source;
pub mod repositories;

pub use cache::InMemoryRateCache;
pub use clock::{FixedClock, SystemClock};
pub use config::{
    ConfigError, LedgerConfig, RateSourceConfig, RatesConfig, ServerConfig, StorageConfig,
};
pub use rate_source::{
    CircuitBreakerConfig, CircuitState, InMemoryRateSource, ResilientRateSource, RetryPolicy,
    TreasuryRateClient,
};
pub use repositories::{ConfiguredPurchaseStore, InMemoryPurchaseStore, SqlitePurchaseStore};
