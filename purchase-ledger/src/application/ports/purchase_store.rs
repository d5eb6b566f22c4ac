use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Purchase, PurchaseId};

/// Storage failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another purchase already holds this idempotency key
    #[error("Idempotency key already stored: {0}")]
    DuplicateKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Durable purchase storage.
///
/// Implementations must enforce uniqueness of the idempotency key atomically:
/// `add` either stores the purchase or fails with [`StoreError::DuplicateKey`],
/// never both and never a partial row.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Get a purchase by ID
    async fn get_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError>;

    /// Get the purchase stored under an idempotency key.
    ///
    /// Always a fresh read of committed state, so a concurrent writer's row is visible.
    async fn get_by_key(&self, key: &str) -> Result<Option<Purchase>, StoreError>;

    /// Insert a new purchase
    async fn add(&self, purchase: Purchase) -> Result<(), StoreError>;

    /// Readiness probe
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
