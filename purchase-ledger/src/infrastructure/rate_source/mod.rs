mod in_memory;
mod resilient;
mod treasury_client;

pub use in_memory::InMemoryRateSource;
pub use resilient::{CircuitBreakerConfig, CircuitState, ResilientRateSource, RetryPolicy};
pub use treasury_client::{
    DEFAULT_TREASURY_BASE_URL, TreasuryRateClient, parse_rates, treasury_currency_desc,
};
