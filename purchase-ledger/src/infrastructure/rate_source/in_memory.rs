//! In-memory rate source
//!
//! Serves a fixed set of observations and counts calls, so tests can assert how
//! often the resolver reached the source.

use crate::application::ports::{RateSource, RateSourceError};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use fx_core::{CurrencyCode, ExchangeRateObservation};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct CallCounters {
    exact: AtomicUsize,
    range: AtomicUsize,
}

pub struct InMemoryRateSource {
    observations: Arc<DashMap<CurrencyCode, Vec<ExchangeRateObservation>>>,
    calls: Arc<CallCounters>,
}

impl InMemoryRateSource {
    pub fn new() -> Self {
        Self {
            observations: Arc::new(DashMap::new()),
            calls: Arc::new(CallCounters::default()),
        }
    }

    /// Publish a rate effective (and recorded) on `date`
    pub fn publish(&self, currency: &CurrencyCode, rate: Decimal, date: NaiveDate) {
        if let Ok(observation) = ExchangeRateObservation::new(currency.clone(), rate, date, date)
        {
            self.add(observation);
        }
    }

    pub fn add(&self, observation: ExchangeRateObservation) {
        self.observations
            .entry(observation.currency.clone())
            .or_default()
            .push(observation);
    }

    pub fn exact_calls(&self) -> usize {
        self.calls.exact.load(Ordering::SeqCst)
    }

    pub fn range_calls(&self) -> usize {
        self.calls.range.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryRateSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryRateSource {
    fn clone(&self) -> Self {
        Self {
            observations: Arc::clone(&self.observations),
            calls: Arc::clone(&self.calls),
        }
    }
}

#[async_trait]
impl RateSource for InMemoryRateSource {
    async fn get_rate(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, RateSourceError> {
        self.calls.exact.fetch_add(1, Ordering::SeqCst);
        Ok(self.observations.get(currency).and_then(|list| {
            list.iter()
                .filter(|o| o.date == date)
                .max_by_key(|o| o.record_date)
                .map(|o| o.rate)
        }))
    }

    async fn get_rates_range(
        &self,
        currency: &CurrencyCode,
        start: NaiveDate,
    ) -> Result<Vec<ExchangeRateObservation>, RateSourceError> {
        self.calls.range.fetch_add(1, Ordering::SeqCst);
        let mut found: Vec<_> = self
            .observations
            .get(currency)
            .map(|list| list.iter().filter(|o| o.date >= start).cloned().collect())
            .unwrap_or_default();
        found.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(found)
    }
}
