//! Store selected at startup from [`StorageConfig`]

use crate::application::ports::{PurchaseStore, StoreError};
use crate::domain::{Purchase, PurchaseId};
use crate::infrastructure::config::StorageConfig;
use async_trait::async_trait;

use super::{InMemoryPurchaseStore, SqlitePurchaseStore};

pub enum ConfiguredPurchaseStore {
    InMemory(InMemoryPurchaseStore),
    Sqlite(SqlitePurchaseStore),
}

impl ConfiguredPurchaseStore {
    /// SQLite when a path is configured, in-memory otherwise
    pub fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        match &config.sqlite_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Opening SQLite purchase store");
                SqlitePurchaseStore::open(path).map(ConfiguredPurchaseStore::Sqlite)
            }
            None => {
                tracing::warn!("No database path configured, purchases are kept in memory");
                Ok(ConfiguredPurchaseStore::InMemory(InMemoryPurchaseStore::new()))
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            ConfiguredPurchaseStore::InMemory(_) => "in-memory",
            ConfiguredPurchaseStore::Sqlite(_) => "sqlite",
        }
    }
}

#[async_trait]
impl PurchaseStore for ConfiguredPurchaseStore {
    async fn get_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
        match self {
            ConfiguredPurchaseStore::InMemory(store) => store.get_by_id(id).await,
            ConfiguredPurchaseStore::Sqlite(store) => store.get_by_id(id).await,
        }
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<Purchase>, StoreError> {
        match self {
            ConfiguredPurchaseStore::InMemory(store) => store.get_by_key(key).await,
            ConfiguredPurchaseStore::Sqlite(store) => store.get_by_key(key).await,
        }
    }

    async fn add(&self, purchase: Purchase) -> Result<(), StoreError> {
        match self {
            ConfiguredPurchaseStore::InMemory(store) => store.add(purchase).await,
            ConfiguredPurchaseStore::Sqlite(store) => store.add(purchase).await,
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        match self {
            ConfiguredPurchaseStore::InMemory(store) => store.health_check().await,
            ConfiguredPurchaseStore::Sqlite(store) => store.health_check().await,
        }
    }
}
