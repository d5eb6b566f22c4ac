use async_trait::async_trait;
use chrono::NaiveDate;
use fx_core::{CurrencyCode, ExchangeRateObservation};
use rust_decimal::Decimal;
use thiserror::Error;

/// Rate source failures.
///
/// "No data" is never an error: empty or malformed upstream payloads come back as
/// `Ok(None)` / `Ok(vec![])`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateSourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream returned status {status}")]
    Upstream { status: u16 },

    #[error("Rate source timed out")]
    Timeout,

    #[error("Rate source circuit open")]
    CircuitOpen,
}

/// Historical exchange-rate provider
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Rate published for exactly `date`
    async fn get_rate(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, RateSourceError>;

    /// Every observation dated on or after `start`, newest first
    async fn get_rates_range(
        &self,
        currency: &CurrencyCode,
        start: NaiveDate,
    ) -> Result<Vec<ExchangeRateObservation>, RateSourceError>;
}
