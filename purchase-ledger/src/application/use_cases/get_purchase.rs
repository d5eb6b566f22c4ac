use crate::application::ports::PurchaseStore;
use crate::domain::{Purchase, PurchaseId};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GetPurchaseError {
    #[error("Purchase not found: {0}")]
    NotFound(PurchaseId),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub struct GetPurchaseUseCase<P>
where
    P: PurchaseStore,
{
    store: Arc<P>,
}

impl<P> GetPurchaseUseCase<P>
where
    P: PurchaseStore,
{
    pub fn new(store: Arc<P>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, id: PurchaseId) -> Result<Purchase, GetPurchaseError> {
        self.store
            .get_by_id(id)
            .await
            .map_err(|e| GetPurchaseError::Storage(e.to_string()))?
            .ok_or(GetPurchaseError::NotFound(id))
    }
}
