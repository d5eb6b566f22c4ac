//! Exchange Rate Resolver
//!
//! Finds a usable rate for `(currency, date)`:
//!
//! - **Today (or later)**: exact lookup against the source on every call. The
//!   current day's rate is provisional, so it never enters the cache.
//! - **Historical**: served from a per-currency [`RateBucket`] cache. Exact date
//!   first, then the latest earlier observation inside the lookback window. A
//!   miss refetches the bucket from the source and replaces the cached copy.
//!
//! The cache is best-effort. Read, decode and write failures are logged and
//! treated as a miss.

use crate::application::ports::{RateCache, RateSource, RateSourceError};
use crate::domain::Clock;
use chrono::{Months, NaiveDate};
use fx_core::{CurrencyCode, ExchangeRateObservation, RateBucket};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const CACHE_KEY_PREFIX: &str = "exchange-rates";

/// Lookback and cache settings for rate resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    /// How far before the requested date a fallback rate may be taken from
    pub lookback_months: u32,
    /// Lifetime of a cached bucket. Bounds cache staleness, not data age.
    pub cache_ttl: Duration,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            lookback_months: 6,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// A rate ready for conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRate {
    pub rate: Decimal,
    /// Date of the observation actually used
    pub effective_date: NaiveDate,
}

impl From<&ExchangeRateObservation> for ResolvedRate {
    fn from(observation: &ExchangeRateObservation) -> Self {
        Self {
            rate: observation.rate,
            effective_date: observation.date,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No exchange rate for {currency} on or within the lookback window before {date}")]
    RateUnavailable {
        currency: CurrencyCode,
        date: NaiveDate,
    },

    #[error("Rate source failed: {0}")]
    Source(#[from] RateSourceError),
}

pub struct ExchangeRateResolver<S, K, C>
where
    S: RateSource,
    K: RateCache,
    C: Clock,
{
    source: Arc<S>,
    cache: Arc<K>,
    clock: Arc<C>,
    policy: RatePolicy,
}

impl<S, K, C> ExchangeRateResolver<S, K, C>
where
    S: RateSource,
    K: RateCache,
    C: Clock,
{
    pub fn new(source: Arc<S>, cache: Arc<K>, clock: Arc<C>, policy: RatePolicy) -> Self {
        Self {
            source,
            cache,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &RatePolicy {
        &self.policy
    }

    pub async fn resolve(
        &self,
        currency: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<ResolvedRate, ResolveError> {
        let today = self.clock.today();
        if as_of >= today {
            return self.resolve_provisional(currency, as_of).await;
        }

        let earliest = self.window_start(as_of);
        let key = cache_key(currency);

        if let Some(bucket) = self.read_bucket(&key, currency).await {
            if let Some(observation) = bucket.find(as_of, earliest) {
                tracing::debug!(
                    currency = %currency,
                    as_of = %as_of,
                    effective = %observation.date,
                    "Rate served from cache"
                );
                return Ok(observation.into());
            }
        }

        let start = earliest.min(self.window_start(today));
        let observations = self.source.get_rates_range(currency, start).await?;
        let bucket = RateBucket::new(currency.clone(), observations).before(today);

        if !bucket.is_empty() {
            self.write_bucket(&key, &bucket).await;
        }

        bucket
            .find(as_of, earliest)
            .map(ResolvedRate::from)
            .ok_or_else(|| ResolveError::RateUnavailable {
                currency: currency.clone(),
                date: as_of,
            })
    }

    async fn resolve_provisional(
        &self,
        currency: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<ResolvedRate, ResolveError> {
        match self.source.get_rate(currency, as_of).await? {
            Some(rate) => Ok(ResolvedRate {
                rate,
                effective_date: as_of,
            }),
            None => Err(ResolveError::RateUnavailable {
                currency: currency.clone(),
                date: as_of,
            }),
        }
    }

    fn window_start(&self, date: NaiveDate) -> NaiveDate {
        date.checked_sub_months(Months::new(self.policy.lookback_months))
            .unwrap_or(NaiveDate::MIN)
    }

    async fn read_bucket(&self, key: &str, currency: &CurrencyCode) -> Option<RateBucket> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Rate cache read failed, treating as miss");
                return None;
            }
        };

        match RateBucket::from_json_bytes(&bytes) {
            Ok(bucket) if bucket.currency() == currency => Some(bucket),
            Ok(bucket) => {
                tracing::warn!(
                    key,
                    cached = %bucket.currency(),
                    "Cached bucket holds another currency, ignoring"
                );
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Cached rate bucket is corrupt, ignoring");
                None
            }
        }
    }

    async fn write_bucket(&self, key: &str, bucket: &RateBucket) {
        let bytes = match bucket.to_json_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to encode rate bucket");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, bytes, self.policy.cache_ttl).await {
            tracing::warn!(key, error = %e, "Rate cache write failed");
        }
    }
}

fn cache_key(currency: &CurrencyCode) -> String {
    format!("{}:{}", CACHE_KEY_PREFIX, currency)
}
