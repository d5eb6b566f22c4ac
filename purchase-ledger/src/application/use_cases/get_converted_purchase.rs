use crate::application::ports::{PurchaseStore, RateCache, RateSource};
use crate::application::services::{ExchangeRateResolver, ResolveError};
use crate::domain::{Clock, CurrencyCode, Money, Purchase, PurchaseId};
use chrono::NaiveDate;
use fx_core::{ConversionError, CurrencyConverter};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

/// A purchase reported in another currency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPurchase {
    pub id: PurchaseId,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub original_amount: Money,
    pub converted_amount: Money,
    pub rate: Decimal,
    pub rate_effective_date: NaiveDate,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertedPurchaseError {
    #[error("Purchase not found: {0}")]
    NotFound(PurchaseId),

    #[error("No exchange rate for {currency} within the lookback window before {date}")]
    RateUnavailable {
        currency: CurrencyCode,
        date: NaiveDate,
    },

    #[error("Rate source unavailable: {0}")]
    RateSource(String),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ResolveError> for ConvertedPurchaseError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::RateUnavailable { currency, date } => {
                ConvertedPurchaseError::RateUnavailable { currency, date }
            }
            ResolveError::Source(source) => ConvertedPurchaseError::RateSource(source.to_string()),
        }
    }
}

pub struct GetConvertedPurchaseUseCase<P, S, K, C>
where
    P: PurchaseStore,
    S: RateSource,
    K: RateCache,
    C: Clock,
{
    store: Arc<P>,
    resolver: Arc<ExchangeRateResolver<S, K, C>>,
    converter: CurrencyConverter,
}

impl<P, S, K, C> GetConvertedPurchaseUseCase<P, S, K, C>
where
    P: PurchaseStore,
    S: RateSource,
    K: RateCache,
    C: Clock,
{
    pub fn new(
        store: Arc<P>,
        resolver: Arc<ExchangeRateResolver<S, K, C>>,
        converter: CurrencyConverter,
    ) -> Self {
        Self {
            store,
            resolver,
            converter,
        }
    }

    pub async fn execute(
        &self,
        id: PurchaseId,
        target: &CurrencyCode,
    ) -> Result<ConvertedPurchase, ConvertedPurchaseError> {
        let purchase = self
            .store
            .get_by_id(id)
            .await
            .map_err(|e| ConvertedPurchaseError::Storage(e.to_string()))?
            .ok_or(ConvertedPurchaseError::NotFound(id))?;

        if purchase.currency() == target {
            let converted_amount = purchase.original_amount.clone();
            let rate_effective_date = purchase.transaction_date;
            return Ok(report(purchase, converted_amount, Decimal::ONE, rate_effective_date));
        }

        let quoted = self.quoted_currency(purchase.currency(), target);
        let resolved = self
            .resolver
            .resolve(&quoted, purchase.transaction_date)
            .await?;
        let converted_amount =
            self.converter
                .convert(&purchase.original_amount, resolved.rate, target)?;

        tracing::debug!(
            purchase_id = %id,
            target = %target,
            rate = %resolved.rate,
            effective = %resolved.effective_date,
            "Purchase converted"
        );

        Ok(report(
            purchase,
            converted_amount,
            resolved.rate,
            resolved.effective_date,
        ))
    }

    /// Rates are quoted per unit of the pivot, so the non-pivot side names the
    /// series. Between two non-pivot currencies the target's series is used.
    fn quoted_currency(&self, source: &CurrencyCode, target: &CurrencyCode) -> CurrencyCode {
        if target == self.converter.pivot() {
            source.clone()
        } else {
            target.clone()
        }
    }
}

fn report(
    purchase: Purchase,
    converted_amount: Money,
    rate: Decimal,
    rate_effective_date: NaiveDate,
) -> ConvertedPurchase {
    ConvertedPurchase {
        id: purchase.id,
        description: purchase.description,
        transaction_date: purchase.transaction_date,
        original_amount: purchase.original_amount,
        converted_amount,
        rate,
        rate_effective_date,
    }
}
