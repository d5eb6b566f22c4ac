//! Retry and circuit-breaker decorator for any [`RateSource`]
//!
//! Each call gets bounded retries with capped exponential backoff plus jitter and
//! a per-attempt timeout. Consecutive failed calls trip a breaker that fails fast
//! until its open period elapses, after which a single trial call decides whether
//! to close it again.

use crate::application::ports::{RateSource, RateSourceError};
use async_trait::async_trait;
use chrono::NaiveDate;
use fx_core::{CurrencyCode, ExchangeRateObservation};
use parking_lot::Mutex;
use rand::Rng;
use rust_decimal::Decimal;
use std::future::Future;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(200),
            backoff_max: Duration::from_millis(2000),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based): full exponential step,
    /// capped, then jittered down to between half and all of it.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let step = self
            .backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max);
        let ceiling = step.as_millis() as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        let jittered = rand::thread_rng().gen_range(ceiling / 2..=ceiling);
        Duration::from_millis(jittered)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed calls that open the circuit
    pub failure_threshold: u32,
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open { until: Instant },
    HalfOpen,
}

#[derive(Debug)]
struct Breaker {
    state: CircuitState,
    consecutive_failures: u32,
    /// Id of the half-open trial call currently in flight
    trial: Option<u64>,
    next_trial: u64,
}

/// Releases the half-open trial slot if the trial ends without a recorded result
struct TrialGuard<'a> {
    breaker: &'a Mutex<Breaker>,
    id: u64,
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        let mut breaker = self.breaker.lock();
        if breaker.trial == Some(self.id) {
            breaker.trial = None;
        }
    }
}

pub struct ResilientRateSource<S: RateSource> {
    inner: S,
    retry: RetryPolicy,
    breaker_config: CircuitBreakerConfig,
    breaker: Mutex<Breaker>,
}

impl<S: RateSource> ResilientRateSource<S> {
    pub fn new(inner: S, retry: RetryPolicy, breaker_config: CircuitBreakerConfig) -> Self {
        Self {
            inner,
            retry,
            breaker_config,
            breaker: Mutex::new(Breaker {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                trial: None,
                next_trial: 0,
            }),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.lock().state
    }

    /// Let a call through, or fail fast. While half-open only one trial call runs;
    /// it holds the returned guard until it finishes.
    fn admit(&self) -> Result<Option<TrialGuard<'_>>, RateSourceError> {
        let mut breaker = self.breaker.lock();
        match breaker.state {
            CircuitState::Closed => return Ok(None),
            CircuitState::HalfOpen if breaker.trial.is_some() => {
                return Err(RateSourceError::CircuitOpen);
            }
            CircuitState::HalfOpen => {}
            CircuitState::Open { until } if Instant::now() >= until => {
                tracing::warn!("Rate source circuit half-open, sending trial call");
                breaker.state = CircuitState::HalfOpen;
            }
            CircuitState::Open { .. } => return Err(RateSourceError::CircuitOpen),
        }

        let id = breaker.next_trial;
        breaker.next_trial = breaker.next_trial.wrapping_add(1);
        breaker.trial = Some(id);
        Ok(Some(TrialGuard {
            breaker: &self.breaker,
            id,
        }))
    }

    fn record_success(&self) {
        let mut breaker = self.breaker.lock();
        if breaker.state != CircuitState::Closed {
            tracing::warn!("Rate source circuit closed");
        }
        breaker.state = CircuitState::Closed;
        breaker.consecutive_failures = 0;
        breaker.trial = None;
    }

    fn record_failure(&self) {
        let mut breaker = self.breaker.lock();
        breaker.consecutive_failures = breaker.consecutive_failures.saturating_add(1);
        breaker.trial = None;
        let trip = breaker.state == CircuitState::HalfOpen
            || breaker.consecutive_failures >= self.breaker_config.failure_threshold;
        if trip {
            tracing::warn!(
                failures = breaker.consecutive_failures,
                open_for = ?self.breaker_config.open_duration,
                "Rate source circuit opened"
            );
            breaker.state = CircuitState::Open {
                until: Instant::now() + self.breaker_config.open_duration,
            };
        }
    }

    async fn call<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> Result<T, RateSourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RateSourceError>>,
    {
        let _trial = self.admit()?;

        let mut attempt = 0u32;
        loop {
            let outcome = match tokio::time::timeout(self.retry.attempt_timeout, attempt_fn()).await {
                Ok(result) => result,
                Err(_) => Err(RateSourceError::Timeout),
            };

            match outcome {
                Ok(value) => {
                    self.record_success();
                    return Ok(value);
                }
                Err(e) if is_transient(&e) && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Rate source call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    // A 4xx means the source is up and answered; it does not count
                    if is_transient(&e) {
                        self.record_failure();
                    } else {
                        self.record_success();
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Worth retrying: transport failures, timeouts, throttling and 5xx
fn is_transient(error: &RateSourceError) -> bool {
    match error {
        RateSourceError::Network(_) | RateSourceError::Timeout => true,
        RateSourceError::Upstream { status } => *status == 429 || *status >= 500,
        RateSourceError::CircuitOpen => false,
    }
}

#[async_trait]
impl<S: RateSource> RateSource for ResilientRateSource<S> {
    async fn get_rate(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, RateSourceError> {
        self.call("get_rate", || self.inner.get_rate(currency, date))
            .await
    }

    async fn get_rates_range(
        &self,
        currency: &CurrencyCode,
        start: NaiveDate,
    ) -> Result<Vec<ExchangeRateObservation>, RateSourceError> {
        self.call("get_rates_range", || self.inner.get_rates_range(currency, start))
            .await
    }
}
