//! Exchange-rate observations and per-currency buckets
//!
//! Rates are quoted as units of foreign currency per one unit of the pivot
//! currency, exactly as the source publishes them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::CurrencyCode;
use crate::error::MoneyError;

/// One published rate point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateObservation {
    pub currency: CurrencyCode,
    pub rate: Decimal,
    /// Date the rate is effective from
    pub date: NaiveDate,
    /// Date the source recorded the rate
    pub record_date: NaiveDate,
}

impl ExchangeRateObservation {
    pub fn new(
        currency: CurrencyCode,
        rate: Decimal,
        date: NaiveDate,
        record_date: NaiveDate,
    ) -> Result<Self, MoneyError> {
        if rate <= Decimal::ZERO {
            return Err(MoneyError::NonPositiveRate(rate));
        }
        Ok(Self {
            currency,
            rate,
            date,
            record_date,
        })
    }
}

/// All known observations for one currency, cached and refreshed as a unit.
///
/// Observations are kept sorted by date, newest first, with at most one per date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredBucket")]
pub struct RateBucket {
    currency: CurrencyCode,
    observations: Vec<ExchangeRateObservation>,
}

/// Wire form of a bucket; ordering is restored on the way in
#[derive(Deserialize)]
struct StoredBucket {
    currency: CurrencyCode,
    observations: Vec<ExchangeRateObservation>,
}

impl From<StoredBucket> for RateBucket {
    fn from(stored: StoredBucket) -> Self {
        RateBucket::new(stored.currency, stored.observations)
    }
}

impl RateBucket {
    /// Build a bucket, keeping only observations for `currency`.
    ///
    /// When two observations share a date, the one recorded last wins.
    pub fn new(currency: CurrencyCode, observations: Vec<ExchangeRateObservation>) -> Self {
        let mut observations: Vec<_> = observations
            .into_iter()
            .filter(|o| o.currency == currency)
            .collect();
        observations.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.record_date.cmp(&a.record_date))
        });
        observations.dedup_by_key(|o| o.date);

        Self {
            currency,
            observations,
        }
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn observations(&self) -> &[ExchangeRateObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Drop every observation dated on or after `cutoff`
    pub fn before(mut self, cutoff: NaiveDate) -> Self {
        self.observations.retain(|o| o.date < cutoff);
        self
    }

    /// Exact match on `as_of`, otherwise the latest observation strictly before it.
    ///
    /// Observations dated before `earliest` are never returned.
    pub fn find(&self, as_of: NaiveDate, earliest: NaiveDate) -> Option<&ExchangeRateObservation> {
        self.observations
            .iter()
            .find(|o| o.date <= as_of)
            .filter(|o| o.date >= earliest)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn brl(rate: Decimal, on: NaiveDate) -> ExchangeRateObservation {
        ExchangeRateObservation::new(CurrencyCode::new("BRL").unwrap(), rate, on, on).unwrap()
    }

    fn bucket() -> RateBucket {
        RateBucket::new(
            CurrencyCode::new("BRL").unwrap(),
            vec![
                brl(dec!(4.85), date(2023, 9, 30)),
                brl(dec!(4.90), date(2023, 12, 12)),
                brl(dec!(5.01), date(2023, 6, 30)),
            ],
        )
    }

    #[test]
    fn test_sorted_newest_first() {
        let dates: Vec<_> = bucket().observations().iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![date(2023, 12, 12), date(2023, 9, 30), date(2023, 6, 30)]);
    }

    #[test]
    fn test_exact_match_wins() {
        let b = bucket();
        let hit = b.find(date(2023, 9, 30), date(2023, 1, 1)).unwrap();
        assert_eq!(hit.rate, dec!(4.85));
    }

    #[test]
    fn test_nearest_prior_date() {
        let b = bucket();
        let hit = b.find(date(2023, 12, 15), date(2023, 6, 15)).unwrap();
        assert_eq!(hit.date, date(2023, 12, 12));

        let hit = b.find(date(2023, 12, 11), date(2023, 6, 11)).unwrap();
        assert_eq!(hit.date, date(2023, 9, 30));
    }

    #[test]
    fn test_nothing_before_earliest_allowed() {
        let b = bucket();
        assert!(b.find(date(2023, 6, 29), date(2023, 1, 1)).is_none());
        assert!(b.find(date(2023, 9, 29), date(2023, 7, 1)).is_none());
    }

    #[test]
    fn test_duplicate_dates_keep_latest_record() {
        let on = date(2023, 12, 31);
        let mut revised = brl(dec!(4.86), on);
        revised.record_date = date(2024, 1, 2);
        let b = RateBucket::new(
            CurrencyCode::new("BRL").unwrap(),
            vec![brl(dec!(4.84), on), revised],
        );
        assert_eq!(b.len(), 1);
        assert_eq!(b.observations()[0].rate, dec!(4.86));
    }

    #[test]
    fn test_other_currencies_ignored() {
        let eur = ExchangeRateObservation::new(
            CurrencyCode::new("EUR").unwrap(),
            dec!(0.92),
            date(2023, 12, 12),
            date(2023, 12, 12),
        )
        .unwrap();
        let b = RateBucket::new(CurrencyCode::new("BRL").unwrap(), vec![eur]);
        assert!(b.is_empty());
    }

    #[test]
    fn test_before_drops_cutoff_and_later() {
        let b = bucket().before(date(2023, 12, 12));
        assert_eq!(b.len(), 2);
        assert!(b.observations().iter().all(|o| o.date < date(2023, 12, 12)));
    }

    #[test]
    fn test_json_bytes() {
        let b = bucket();
        let bytes = b.to_json_bytes().unwrap();
        assert_eq!(RateBucket::from_json_bytes(&bytes).unwrap(), b);
        assert!(RateBucket::from_json_bytes(b"not json").is_err());
    }

    #[test]
    fn test_decoding_restores_order() {
        let oldest_first = serde_json::json!({
            "currency": "BRL",
            "observations": [
                {"currency": "BRL", "rate": "5.01", "date": "2023-06-30", "recordDate": "2023-06-30"},
                {"currency": "BRL", "rate": "4.85", "date": "2023-09-30", "recordDate": "2023-09-30"},
                {"currency": "BRL", "rate": "4.90", "date": "2023-12-12", "recordDate": "2023-12-12"},
                {"currency": "EUR", "rate": "0.92", "date": "2023-12-13", "recordDate": "2023-12-13"}
            ]
        });

        let b = RateBucket::from_json_bytes(oldest_first.to_string().as_bytes()).unwrap();

        assert_eq!(b, bucket());
        let hit = b.find(date(2023, 12, 15), date(2023, 6, 15)).unwrap();
        assert_eq!(hit.rate, dec!(4.90));
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        let on = date(2023, 1, 1);
        assert!(
            ExchangeRateObservation::new(CurrencyCode::usd(), dec!(0), on, on).is_err()
        );
    }
}
