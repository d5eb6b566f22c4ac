//! Purchase entity
//!
//! A purchase is written once by the ingestion guard and never mutated afterwards.
//! Its id is generated at construction, before the store ever sees it.

use chrono::NaiveDate;
use fx_core::{CurrencyCode, Money, MoneyError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum description length, in characters
pub const MAX_DESCRIPTION_LEN: usize = 50;

const GENERATED_KEY_PREFIX: &str = "generated:";

/// Unique identifier for a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PurchaseId(Uuid);

impl PurchaseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PurchaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PurchaseId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Deduplication key stored with every purchase.
///
/// Requests without a client key get a generated surrogate so that the store's
/// uniqueness constraint never fires between unrelated keyless requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "origin", content = "value", rename_all = "snake_case")]
pub enum IdempotencyKey {
    Client(String),
    Generated(String),
}

impl IdempotencyKey {
    /// Normalize a client-supplied key. Missing, empty and blank keys all mean
    /// "no deduplication" and yield a fresh surrogate.
    pub fn from_client(key: Option<&str>) -> Self {
        match key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(k) => IdempotencyKey::Client(k.to_string()),
            None => IdempotencyKey::generate(),
        }
    }

    pub fn generate() -> Self {
        IdempotencyKey::Generated(format!("{}{}", GENERATED_KEY_PREFIX, Uuid::new_v4()))
    }

    /// Value held in the store's unique key column
    pub fn as_str(&self) -> &str {
        match self {
            IdempotencyKey::Client(k) | IdempotencyKey::Generated(k) => k,
        }
    }

    /// The key as the client sent it, if any
    pub fn client_key(&self) -> Option<&str> {
        match self {
            IdempotencyKey::Client(k) => Some(k),
            IdempotencyKey::Generated(_) => None,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, IdempotencyKey::Generated(_))
    }
}

/// Errors raised when a purchase payload breaks the entity invariants
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    #[error("Description must not be empty")]
    EmptyDescription,

    #[error("Description exceeds {max} characters (got {len})")]
    DescriptionTooLong { len: usize, max: usize },

    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// The canonical fields compared when a key is replayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseDetails {
    pub description: String,
    pub transaction_date: NaiveDate,
    pub amount: Money,
}

impl PurchaseDetails {
    pub fn new(
        description: &str,
        transaction_date: NaiveDate,
        amount: Decimal,
        currency: &str,
    ) -> Result<Self, PurchaseError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(PurchaseError::EmptyDescription);
        }
        let len = description.chars().count();
        if len > MAX_DESCRIPTION_LEN {
            return Err(PurchaseError::DescriptionTooLong {
                len,
                max: MAX_DESCRIPTION_LEN,
            });
        }

        Ok(Self {
            description: description.to_string(),
            transaction_date,
            amount: Money::new(amount, CurrencyCode::new(currency)?)?,
        })
    }
}

/// A recorded purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub original_amount: Money,
    pub idempotency_key: IdempotencyKey,
}

impl Purchase {
    pub fn new(details: PurchaseDetails, idempotency_key: IdempotencyKey) -> Self {
        Self {
            id: PurchaseId::new(),
            description: details.description,
            transaction_date: details.transaction_date,
            original_amount: details.amount,
            idempotency_key,
        }
    }

    /// Whether a replayed request carries the same canonical payload
    pub fn matches(&self, details: &PurchaseDetails) -> bool {
        self.description == details.description
            && self.transaction_date == details.transaction_date
            && self.original_amount == details.amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        self.original_amount.currency()
    }
}
