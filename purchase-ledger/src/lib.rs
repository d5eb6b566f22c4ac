//! Purchase Ledger
//!
//! Records purchases exactly once per idempotency key and reports them in other
//! currencies using U.S. Treasury historical exchange rates.
//!
//! # Architecture
//!
//! - **Domain**: Purchase entity, idempotency keys, the Clock port
//! - **Application**: Ports (store, rate source, rate cache), the exchange rate
//!   resolver and the use cases
//! - **Infrastructure**: SQLite and in-memory stores, the Treasury client with its
//!   retry/circuit-breaker wrapper, the TTL cache, config loading
//! - **Presentation**: REST API
//!
//! Money and currency-conversion types live in the `fx-core` crate.
//!
//! # Example
//!
//! ```ignore
//! use purchase_ledger::{Ledger, infrastructure::LedgerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = Ledger::from_config(LedgerConfig::default())?;
//!     ledger.run().await?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use domain::{
    Clock, CurrencyCode, IdempotencyKey, Money, Purchase, PurchaseDetails, PurchaseError,
    PurchaseId,
};

pub use application::{
    ConvertedPurchase, ConvertedPurchaseError, CreatePurchaseCommand, CreatePurchaseError,
    CreatePurchaseResult, CreatePurchaseUseCase, ExchangeRateResolver,
    GetConvertedPurchaseUseCase, RatePolicy,
};

// Re-export port traits for integration tests
pub use application::ports::{PurchaseStore, RateCache, RateSource};

pub use infrastructure::{
    ConfiguredPurchaseStore, FixedClock, InMemoryPurchaseStore, InMemoryRateCache,
    InMemoryRateSource, LedgerConfig, ResilientRateSource, SqlitePurchaseStore, SystemClock,
    TreasuryRateClient,
};

pub use presentation::{AppState, create_router};

use application::ports::{RateSourceError, StoreError};
use axum::Router;
use fx_core::CurrencyConverter;
use infrastructure::ConfigError;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

/// Startup failures
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open purchase store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build rate source client: {0}")]
    RateSource(#[from] RateSourceError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rate source used in production: Treasury client behind retries and a breaker
pub type TreasuryRateSource = ResilientRateSource<TreasuryRateClient>;

/// The assembled service
pub struct Ledger<P, S, K, C>
where
    P: PurchaseStore + 'static,
    S: RateSource + 'static,
    K: RateCache + 'static,
    C: Clock + 'static,
{
    pub config: LedgerConfig,
    pub store: Arc<P>,
    pub resolver: Arc<ExchangeRateResolver<S, K, C>>,
    pub clock: Arc<C>,
    pub converter: CurrencyConverter,
}

impl<P, S, K, C> Ledger<P, S, K, C>
where
    P: PurchaseStore + 'static,
    S: RateSource + 'static,
    K: RateCache + 'static,
    C: Clock + 'static,
{
    /// Assemble from explicit adapters
    pub fn with_components(
        config: LedgerConfig,
        store: Arc<P>,
        source: Arc<S>,
        cache: Arc<K>,
        clock: Arc<C>,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        let converter = CurrencyConverter::new(config.rates.pivot()?);
        let resolver = Arc::new(ExchangeRateResolver::new(
            source,
            cache,
            Arc::clone(&clock),
            config.rates.to_policy(),
        ));

        Ok(Ledger {
            config,
            store,
            resolver,
            clock,
            converter,
        })
    }

    /// Create the REST API router
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState::new(
            Arc::clone(&self.store),
            Arc::clone(&self.resolver),
            Arc::clone(&self.clock),
            self.converter.clone(),
            self.config.server.request_timeout(),
        ));

        create_router(state)
    }

    /// Run the HTTP server
    pub async fn run(self) -> Result<(), LedgerError> {
        let addr = self.config.bind_address();
        let router = self.router();

        tracing::info!("Purchase ledger listening on {}", addr);

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

impl Ledger<ConfiguredPurchaseStore, TreasuryRateSource, InMemoryRateCache, SystemClock> {
    /// Wire production adapters from configuration
    pub fn from_config(config: LedgerConfig) -> Result<Self, LedgerError> {
        let store = Arc::new(ConfiguredPurchaseStore::open(&config.storage)?);
        let client = TreasuryRateClient::new(
            config.rate_source.base_url.clone(),
            config.rate_source.timeout(),
        )?;
        let source = Arc::new(ResilientRateSource::new(
            client,
            config.rate_source.retry_policy(),
            config.rate_source.breaker_config(),
        ));

        Self::with_components(
            config,
            store,
            source,
            Arc::new(InMemoryRateCache::new()),
            Arc::new(SystemClock::new()),
        )
    }
}

impl Ledger<InMemoryPurchaseStore, InMemoryRateSource, InMemoryRateCache, FixedClock> {
    /// Fully in-memory ledger on a controllable clock (for testing)
    pub fn in_memory(
        source: InMemoryRateSource,
        clock: FixedClock,
    ) -> Result<Self, LedgerError> {
        Self::with_components(
            LedgerConfig::default(),
            Arc::new(InMemoryPurchaseStore::new()),
            Arc::new(source),
            Arc::new(InMemoryRateCache::new()),
            Arc::new(clock),
        )
    }
}
