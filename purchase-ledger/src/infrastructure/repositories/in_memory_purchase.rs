//! In-memory purchase store

use crate::application::ports::{PurchaseStore, StoreError};
use crate::domain::{Purchase, PurchaseId};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Thread-safe purchase storage using DashMap.
///
/// The key index entry is held while the purchase row is written, which makes
/// check-and-insert on the idempotency key atomic.
pub struct InMemoryPurchaseStore {
    purchases: Arc<DashMap<PurchaseId, Purchase>>,
    keys: Arc<DashMap<String, PurchaseId>>,
}

impl InMemoryPurchaseStore {
    pub fn new() -> Self {
        Self {
            purchases: Arc::new(DashMap::new()),
            keys: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.purchases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.purchases.is_empty()
    }

    /// Number of rows holding a given key (at most one)
    pub fn count_with_key(&self, key: &str) -> usize {
        self.purchases
            .iter()
            .filter(|p| p.idempotency_key.as_str() == key)
            .count()
    }

    pub fn list(&self) -> Vec<Purchase> {
        self.purchases.iter().map(|p| p.value().clone()).collect()
    }
}

impl Default for InMemoryPurchaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryPurchaseStore {
    fn clone(&self) -> Self {
        Self {
            purchases: Arc::clone(&self.purchases),
            keys: Arc::clone(&self.keys),
        }
    }
}

#[async_trait]
impl PurchaseStore for InMemoryPurchaseStore {
    async fn get_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
        Ok(self.purchases.get(&id).map(|p| p.value().clone()))
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<Purchase>, StoreError> {
        let id = self.keys.get(key).map(|entry| *entry.value());
        Ok(id.and_then(|id| self.purchases.get(&id).map(|p| p.value().clone())))
    }

    async fn add(&self, purchase: Purchase) -> Result<(), StoreError> {
        let key = purchase.idempotency_key.as_str().to_string();
        match self.keys.entry(key) {
            Entry::Occupied(entry) => Err(StoreError::DuplicateKey(entry.key().clone())),
            Entry::Vacant(entry) => {
                if self.purchases.contains_key(&purchase.id) {
                    return Err(StoreError::Backend(format!(
                        "Purchase id already stored: {}",
                        purchase.id
                    )));
                }
                let id = purchase.id;
                self.purchases.insert(id, purchase);
                entry.insert(id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IdempotencyKey, PurchaseDetails};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn make_purchase(key: IdempotencyKey) -> Purchase {
        let details = PurchaseDetails::new(
            "Office Supplies",
            NaiveDate::from_ymd_opt(2023, 12, 15).unwrap(),
            dec!(150),
            "USD",
        )
        .unwrap();
        Purchase::new(details, key)
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let store = InMemoryPurchaseStore::new();
        let purchase = make_purchase(IdempotencyKey::Client("abc".into()));
        let id = purchase.id;

        store.add(purchase.clone()).await.unwrap();

        assert_eq!(store.get_by_id(id).await.unwrap(), Some(purchase.clone()));
        assert_eq!(store.get_by_key("abc").await.unwrap(), Some(purchase));
        assert_eq!(store.get_by_key("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let store = InMemoryPurchaseStore::new();
        store
            .add(make_purchase(IdempotencyKey::Client("abc".into())))
            .await
            .unwrap();

        let result = store
            .add(make_purchase(IdempotencyKey::Client("abc".into())))
            .await;

        assert_eq!(result, Err(StoreError::DuplicateKey("abc".into())));
        assert_eq!(store.len(), 1);
        assert_eq!(store.count_with_key("abc"), 1);
    }

    #[tokio::test]
    async fn test_generated_keys_never_collide() {
        let store = InMemoryPurchaseStore::new();
        for _ in 0..5 {
            store
                .add(make_purchase(IdempotencyKey::generate()))
                .await
                .unwrap();
        }
        assert_eq!(store.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_store_one_row() {
        let store = InMemoryPurchaseStore::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .add(make_purchase(IdempotencyKey::Client("race".into())))
                    .await
            }));
        }

        let mut stored = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                stored += 1;
            }
        }

        assert_eq!(stored, 1);
        assert_eq!(store.len(), 1);
    }
}
