//! SQLite purchase store
//!
//! Uniqueness of the idempotency key is enforced by a partial unique index, so
//! the database, not the caller, arbitrates concurrent inserts of the same key.

use crate::application::ports::{PurchaseStore, StoreError};
use crate::domain::{CurrencyCode, IdempotencyKey, Money, Purchase, PurchaseId};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS purchases (
    id TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    transaction_date TEXT NOT NULL,
    amount TEXT NOT NULL,
    currency TEXT NOT NULL,
    idempotency_key TEXT,
    key_generated INTEGER NOT NULL DEFAULT 0
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_purchases_idempotency_key
    ON purchases(idempotency_key) WHERE idempotency_key IS NOT NULL;
";

const SELECT_COLUMNS: &str =
    "SELECT id, description, transaction_date, amount, currency, idempotency_key, key_generated FROM purchases";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw column values, decoded outside the rusqlite row callback
struct PurchaseRow {
    id: String,
    description: String,
    transaction_date: String,
    amount: String,
    currency: String,
    idempotency_key: Option<String>,
    key_generated: bool,
}

impl PurchaseRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            description: row.get(1)?,
            transaction_date: row.get(2)?,
            amount: row.get(3)?,
            currency: row.get(4)?,
            idempotency_key: row.get(5)?,
            key_generated: row.get(6)?,
        })
    }

    fn into_purchase(self) -> Result<Purchase, StoreError> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            StoreError::Backend(format!("Corrupt {} in purchase {}: {}", field, self.id, e))
        };

        let id = PurchaseId::from_str(&self.id).map_err(|e| corrupt("id", &e))?;
        let transaction_date = NaiveDate::parse_from_str(&self.transaction_date, DATE_FORMAT)
            .map_err(|e| corrupt("transaction_date", &e))?;
        let amount = Decimal::from_str(&self.amount).map_err(|e| corrupt("amount", &e))?;
        let currency = CurrencyCode::new(&self.currency).map_err(|e| corrupt("currency", &e))?;
        let original_amount = Money::new(amount, currency).map_err(|e| corrupt("amount", &e))?;
        let idempotency_key = match self.idempotency_key {
            Some(key) if self.key_generated => IdempotencyKey::Generated(key),
            Some(key) => IdempotencyKey::Client(key),
            None => IdempotencyKey::generate(),
        };

        Ok(Purchase {
            id,
            description: self.description,
            transaction_date,
            original_amount,
            idempotency_key,
        })
    }
}

/// SQLite-backed purchase storage.
///
/// Statements run on the blocking thread pool; the single connection is
/// serialized behind a mutex.
pub struct SqlitePurchaseStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePurchaseStore {
    /// Open (or create) a database file and apply the schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref()).map_err(backend)?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Storage task failed: {}", e)))?
    }

    fn find_one(
        conn: &Connection,
        clause: &str,
        value: String,
    ) -> Result<Option<Purchase>, StoreError> {
        let sql = format!("{} WHERE {} = ?1", SELECT_COLUMNS, clause);
        conn.query_row(&sql, params![value], PurchaseRow::read)
            .optional()
            .map_err(backend)?
            .map(PurchaseRow::into_purchase)
            .transpose()
    }
}

impl Clone for SqlitePurchaseStore {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[async_trait]
impl PurchaseStore for SqlitePurchaseStore {
    async fn get_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
        self.run_blocking(move |conn| Self::find_one(conn, "id", id.to_string()))
            .await
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<Purchase>, StoreError> {
        let key = key.to_string();
        self.run_blocking(move |conn| Self::find_one(conn, "idempotency_key", key))
            .await
    }

    async fn add(&self, purchase: Purchase) -> Result<(), StoreError> {
        self.run_blocking(move |conn| {
            let key = purchase.idempotency_key.as_str().to_string();
            let result = conn.execute(
                "INSERT INTO purchases
                    (id, description, transaction_date, amount, currency, idempotency_key, key_generated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    purchase.id.to_string(),
                    purchase.description,
                    purchase.transaction_date.format(DATE_FORMAT).to_string(),
                    purchase.original_amount.amount().to_string(),
                    purchase.currency().as_str(),
                    key,
                    purchase.idempotency_key.is_generated(),
                ],
            );

            match result {
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateKey(key)),
                Err(e) => Err(backend(e)),
            }
        })
        .await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.run_blocking(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(backend)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PurchaseDetails;
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
    async fn test_round_trip_preserves_fields() {
        let store = SqlitePurchaseStore::open_in_memory().unwrap();
        let purchase = make_purchase(IdempotencyKey::Client("order-1".into()));

        store.add(purchase.clone()).await.unwrap();

        let by_id = store.get_by_id(purchase.id).await.unwrap().unwrap();
        assert_eq!(by_id, purchase);
        assert_eq!(by_id.original_amount.amount().to_string(), "150.00");

        let by_key = store.get_by_key("order-1").await.unwrap().unwrap();
        assert_eq!(by_key.id, purchase.id);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate_key() {
        let store = SqlitePurchaseStore::open_in_memory().unwrap();
        store
            .add(make_purchase(IdempotencyKey::Client("order-1".into())))
            .await
            .unwrap();

        let result = store
            .add(make_purchase(IdempotencyKey::Client("order-1".into())))
            .await;

        assert_eq!(result, Err(StoreError::DuplicateKey("order-1".into())));
    }

    #[tokio::test]
    async fn test_generated_keys_round_trip() {
        let store = SqlitePurchaseStore::open_in_memory().unwrap();
        let first = make_purchase(IdempotencyKey::generate());
        let second = make_purchase(IdempotencyKey::generate());
        store.add(first.clone()).await.unwrap();
        store.add(second).await.unwrap();

        let loaded = store.get_by_id(first.id).await.unwrap().unwrap();
        assert!(loaded.idempotency_key.is_generated());
        assert_eq!(loaded.idempotency_key.client_key(), None);
    }

    #[tokio::test]
    async fn test_missing_rows() {
        let store = SqlitePurchaseStore::open_in_memory().unwrap();
        assert_eq!(store.get_by_id(PurchaseId::new()).await.unwrap(), None);
        assert_eq!(store.get_by_key("nope").await.unwrap(), None);
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let purchase = make_purchase(IdempotencyKey::Client("order-9".into()));

        {
            let store = SqlitePurchaseStore::open(&path).unwrap();
            store.add(purchase.clone()).await.unwrap();
        }

        let store = SqlitePurchaseStore::open(&path).unwrap();
        assert_eq!(store.get_by_id(purchase.id).await.unwrap(), Some(purchase));
    }
}
