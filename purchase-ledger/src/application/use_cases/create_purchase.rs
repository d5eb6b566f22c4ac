use crate::application::ports::{PurchaseStore, StoreError};
use crate::domain::{IdempotencyKey, Purchase, PurchaseDetails, PurchaseError, PurchaseId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct CreatePurchaseCommand {
    pub description: String,
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatePurchaseResult {
    pub id: PurchaseId,
    /// The key was already stored with the same payload
    pub replayed: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreatePurchaseError {
    #[error("Idempotency key '{key}' was already used with a different purchase")]
    Conflict { key: String },

    #[error("Invalid purchase: {0}")]
    InvalidPurchase(#[from] PurchaseError),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Idempotent purchase ingestion.
///
/// The lookup by key is only a short-circuit. The store's unique key constraint
/// decides every race: a writer that loses re-reads the winner's row and answers
/// as a replay or a conflict.
pub struct CreatePurchaseUseCase<P>
where
    P: PurchaseStore,
{
    store: Arc<P>,
}

impl<P> CreatePurchaseUseCase<P>
where
    P: PurchaseStore,
{
    pub fn new(store: Arc<P>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        command: CreatePurchaseCommand,
    ) -> Result<CreatePurchaseResult, CreatePurchaseError> {
        let details = PurchaseDetails::new(
            &command.description,
            command.transaction_date,
            command.amount,
            &command.currency,
        )?;
        let key = IdempotencyKey::from_client(command.idempotency_key.as_deref());

        if let Some(client_key) = key.client_key() {
            if let Some(existing) = self.store.get_by_key(client_key).await.map_err(storage)? {
                return answer_existing(&existing, &details, client_key);
            }
        }

        let purchase = Purchase::new(details.clone(), key.clone());
        let id = purchase.id;

        match self.store.add(purchase).await {
            Ok(()) => {
                tracing::info!(
                    purchase_id = %id,
                    key = key.client_key().unwrap_or("-"),
                    amount = %details.amount,
                    "Purchase recorded"
                );
                Ok(CreatePurchaseResult {
                    id,
                    replayed: false,
                })
            }
            Err(StoreError::DuplicateKey(_)) => {
                tracing::debug!(key = key.as_str(), "Lost insert race, re-reading key");
                match self.store.get_by_key(key.as_str()).await.map_err(storage)? {
                    Some(existing) => answer_existing(&existing, &details, key.as_str()),
                    None => Err(CreatePurchaseError::Storage(format!(
                        "uniqueness violation on key '{}' but no stored row",
                        key.as_str()
                    ))),
                }
            }
            Err(e) => Err(storage(e)),
        }
    }
}

/// Replay when the stored payload matches, conflict otherwise
fn answer_existing(
    existing: &Purchase,
    details: &PurchaseDetails,
    key: &str,
) -> Result<CreatePurchaseResult, CreatePurchaseError> {
    if existing.matches(details) {
        tracing::info!(purchase_id = %existing.id, key, "Idempotent replay");
        Ok(CreatePurchaseResult {
            id: existing.id,
            replayed: true,
        })
    } else {
        tracing::info!(purchase_id = %existing.id, key, "Idempotency key conflict");
        Err(CreatePurchaseError::Conflict {
            key: key.to_string(),
        })
    }
}

fn storage(e: StoreError) -> CreatePurchaseError {
    CreatePurchaseError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryPurchaseStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn command(amount: Decimal, key: Option<&str>) -> CreatePurchaseCommand {
        CreatePurchaseCommand {
            description: "Office Supplies".to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2023, 12, 15).unwrap(),
            amount,
            currency: "USD".to_string(),
            idempotency_key: key.map(str::to_string),
        }
    }

    /// Store whose first `stale_reads` key lookups miss, as if a concurrent
    /// writer committed right after the pre-check
    struct StaleReadStore {
        inner: InMemoryPurchaseStore,
        stale_reads: AtomicUsize,
        key_reads: AtomicUsize,
    }

    impl StaleReadStore {
        fn new(inner: InMemoryPurchaseStore, stale_reads: usize) -> Self {
            Self {
                inner,
                stale_reads: AtomicUsize::new(stale_reads),
                key_reads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PurchaseStore for StaleReadStore {
        async fn get_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
            self.inner.get_by_id(id).await
        }

        async fn get_by_key(&self, key: &str) -> Result<Option<Purchase>, StoreError> {
            self.key_reads.fetch_add(1, Ordering::SeqCst);
            let stale = self
                .stale_reads
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if stale {
                return Ok(None);
            }
            self.inner.get_by_key(key).await
        }

        async fn add(&self, purchase: Purchase) -> Result<(), StoreError> {
            self.inner.add(purchase).await
        }
    }

    /// Store reporting a duplicate on every insert while holding no rows
    struct PhantomDuplicateStore;

    #[async_trait]
    impl PurchaseStore for PhantomDuplicateStore {
        async fn get_by_id(&self, _id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
            Ok(None)
        }

        async fn get_by_key(&self, _key: &str) -> Result<Option<Purchase>, StoreError> {
            Ok(None)
        }

        async fn add(&self, purchase: Purchase) -> Result<(), StoreError> {
            Err(StoreError::DuplicateKey(
                purchase.idempotency_key.as_str().to_string(),
            ))
        }
    }

    struct DownStore;

    #[async_trait]
    impl PurchaseStore for DownStore {
        async fn get_by_id(&self, _id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
            Err(StoreError::Backend("disk I/O error".into()))
        }

        async fn get_by_key(&self, _key: &str) -> Result<Option<Purchase>, StoreError> {
            Err(StoreError::Backend("disk I/O error".into()))
        }

        async fn add(&self, _purchase: Purchase) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk I/O error".into()))
        }
    }

    #[tokio::test]
    async fn test_create_new_purchase() {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let use_case = CreatePurchaseUseCase::new(store.clone());

        let result = use_case.execute(command(dec!(150), Some("k-1"))).await.unwrap();

        assert!(!result.replayed);
        let stored = store.get_by_id(result.id).await.unwrap().unwrap();
        assert_eq!(stored.original_amount.amount(), dec!(150.00));
        assert_eq!(stored.idempotency_key.client_key(), Some("k-1"));
    }

    #[tokio::test]
    async fn test_replay_returns_same_id() {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let use_case = CreatePurchaseUseCase::new(store.clone());

        let first = use_case.execute(command(dec!(150), Some("k-1"))).await.unwrap();
        let second = use_case.execute(command(dec!(150.00), Some("k-1"))).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.replayed);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_same_key_different_payload_conflicts() {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let use_case = CreatePurchaseUseCase::new(store.clone());

        let first = use_case.execute(command(dec!(150), Some("k-1"))).await.unwrap();
        let result = use_case.execute(command(dec!(151), Some("k-1"))).await;

        assert_eq!(
            result,
            Err(CreatePurchaseError::Conflict {
                key: "k-1".to_string()
            })
        );
        assert_eq!(store.len(), 1);
        let stored = store.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(stored.original_amount.amount(), dec!(150.00));
    }

    #[tokio::test]
    async fn test_keyless_requests_never_deduplicate() {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let use_case = CreatePurchaseUseCase::new(store.clone());

        let a = use_case.execute(command(dec!(10), None)).await.unwrap();
        let b = use_case.execute(command(dec!(10), Some(""))).await.unwrap();
        let c = use_case.execute(command(dec!(10), Some("   "))).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_forced_race_resolves_to_replay() {
        let inner = InMemoryPurchaseStore::new();
        let winner = CreatePurchaseUseCase::new(Arc::new(inner.clone()))
            .execute(command(dec!(150), Some("k-race")))
            .await
            .unwrap();

        // The pre-check misses, the insert hits the constraint, the re-query finds the winner
        let store = Arc::new(StaleReadStore::new(inner.clone(), 1));
        let loser = CreatePurchaseUseCase::new(store.clone())
            .execute(command(dec!(150), Some("k-race")))
            .await
            .unwrap();

        assert_eq!(loser.id, winner.id);
        assert!(loser.replayed);
        assert_eq!(store.key_reads.load(Ordering::SeqCst), 2);
        assert_eq!(inner.len(), 1);
    }

    #[tokio::test]
    async fn test_forced_race_resolves_to_conflict() {
        let inner = InMemoryPurchaseStore::new();
        CreatePurchaseUseCase::new(Arc::new(inner.clone()))
            .execute(command(dec!(150), Some("k-race")))
            .await
            .unwrap();

        let store = Arc::new(StaleReadStore::new(inner.clone(), 1));
        let result = CreatePurchaseUseCase::new(store)
            .execute(command(dec!(99), Some("k-race")))
            .await;

        assert!(matches!(result, Err(CreatePurchaseError::Conflict { .. })));
        assert_eq!(inner.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_without_row_is_storage_error() {
        let use_case = CreatePurchaseUseCase::new(Arc::new(PhantomDuplicateStore));

        let result = use_case.execute(command(dec!(1), Some("k-1"))).await;

        assert!(matches!(result, Err(CreatePurchaseError::Storage(_))));
    }

    #[tokio::test]
    async fn test_backend_failure_is_storage_error() {
        let use_case = CreatePurchaseUseCase::new(Arc::new(DownStore));

        assert!(matches!(
            use_case.execute(command(dec!(1), Some("k-1"))).await,
            Err(CreatePurchaseError::Storage(_))
        ));
        assert!(matches!(
            use_case.execute(command(dec!(1), None)).await,
            Err(CreatePurchaseError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_payload_writes_nothing() {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let use_case = CreatePurchaseUseCase::new(store.clone());

        let result = use_case.execute(command(dec!(-5), Some("k-1"))).await;

        assert!(matches!(result, Err(CreatePurchaseError::InvalidPurchase(_))));
        assert!(store.is_empty());
    }
}
