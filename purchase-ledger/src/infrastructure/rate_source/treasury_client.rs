//! U.S. Treasury "Rates of Exchange" client
//!
//! Rates are published per country-currency description (e.g. `Brazil-Real`) as
//! units of foreign currency per U.S. dollar. ISO codes are mapped through a
//! static table; an unmapped code simply has no data.

use crate::application::ports::{RateSource, RateSourceError};
use async_trait::async_trait;
use chrono::NaiveDate;
use fx_core::{CurrencyCode, ExchangeRateObservation};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TREASURY_BASE_URL: &str =
    "https://api.fiscaldata.treasury.gov/services/api/fiscal_service";

const RATES_PATH: &str = "/v1/accounting/od/rates_of_exchange";
const FIELDS: &str = "country_currency_desc,exchange_rate,record_date,effective_date";
const PAGE_SIZE: &str = "1000";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// ISO code → Treasury `country_currency_desc`
const TREASURY_CURRENCIES: &[(&str, &str)] = &[
    ("ARS", "Argentina-Peso"),
    ("AUD", "Australia-Dollar"),
    ("BRL", "Brazil-Real"),
    ("CAD", "Canada-Dollar"),
    ("CHF", "Switzerland-Franc"),
    ("CLP", "Chile-Peso"),
    ("CNY", "China-Renminbi"),
    ("COP", "Colombia-Peso"),
    ("DKK", "Denmark-Krone"),
    ("EUR", "Euro Zone-Euro"),
    ("GBP", "United Kingdom-Pound"),
    ("HKD", "Hong Kong-Dollar"),
    ("INR", "India-Rupee"),
    ("JPY", "Japan-Yen"),
    ("KRW", "Korea-Won"),
    ("MXN", "Mexico-Peso"),
    ("NOK", "Norway-Krone"),
    ("NZD", "New Zealand-Dollar"),
    ("PLN", "Poland-Zloty"),
    ("SEK", "Sweden-Krona"),
    ("SGD", "Singapore-Dollar"),
    ("ZAR", "South Africa-Rand"),
];

pub fn treasury_currency_desc(currency: &CurrencyCode) -> Option<&'static str> {
    TREASURY_CURRENCIES
        .iter()
        .find(|(code, _)| *code == currency.as_str())
        .map(|(_, desc)| *desc)
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    data: Vec<RateRow>,
}

#[derive(Debug, Deserialize)]
struct RateRow {
    exchange_rate: Option<String>,
    record_date: Option<String>,
    effective_date: Option<String>,
}

impl RateRow {
    fn into_observation(self, currency: &CurrencyCode) -> Option<ExchangeRateObservation> {
        let rate = Decimal::from_str(self.exchange_rate?.trim()).ok()?;
        let record_date = NaiveDate::parse_from_str(self.record_date?.trim(), DATE_FORMAT).ok()?;
        let date = match self.effective_date {
            Some(d) => NaiveDate::parse_from_str(d.trim(), DATE_FORMAT).ok()?,
            None => record_date,
        };
        ExchangeRateObservation::new(currency.clone(), rate, date, record_date).ok()
    }
}

/// Decode a Treasury response body. Malformed bodies and rows yield no data.
pub fn parse_rates(body: &str, currency: &CurrencyCode) -> Vec<ExchangeRateObservation> {
    let response: RatesResponse = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(currency = %currency, error = %e, "Malformed rate source response");
            return Vec::new();
        }
    };

    let mut observations: Vec<_> = response
        .data
        .into_iter()
        .filter_map(|row| row.into_observation(currency))
        .collect();
    observations.sort_by(|a, b| b.date.cmp(&a.date));
    observations
}

/// HTTP client for the Treasury Fiscal Data API
#[derive(Clone)]
pub struct TreasuryRateClient {
    client: Client,
    base_url: String,
}

impl TreasuryRateClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RateSourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RateSourceError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(
        &self,
        currency: &CurrencyCode,
        date_filter: String,
    ) -> Result<Vec<ExchangeRateObservation>, RateSourceError> {
        let Some(desc) = treasury_currency_desc(currency) else {
            tracing::debug!(currency = %currency, "Currency not published by rate source");
            return Ok(Vec::new());
        };

        let url = format!("{}{}", self.base_url, RATES_PATH);
        let filter = format!("country_currency_desc:eq:{},{}", desc, date_filter);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("fields", FIELDS),
                ("filter", filter.as_str()),
                ("sort", "-effective_date"),
                ("page[size]", PAGE_SIZE),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(RateSourceError::Upstream {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(transport_error)?;
        Ok(parse_rates(&body, currency))
    }
}

fn transport_error(e: reqwest::Error) -> RateSourceError {
    if e.is_timeout() {
        RateSourceError::Timeout
    } else {
        RateSourceError::Network(e.to_string())
    }
}

#[async_trait]
impl RateSource for TreasuryRateClient {
    async fn get_rate(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, RateSourceError> {
        let filter = format!("effective_date:eq:{}", date.format(DATE_FORMAT));
        let observations = self.fetch(currency, filter).await?;
        Ok(observations
            .into_iter()
            .filter(|o| o.date == date)
            .max_by_key(|o| o.record_date)
            .map(|o| o.rate))
    }

    async fn get_rates_range(
        &self,
        currency: &CurrencyCode,
        start: NaiveDate,
    ) -> Result<Vec<ExchangeRateObservation>, RateSourceError> {
        let filter = format!("effective_date:gte:{}", start.format(DATE_FORMAT));
        self.fetch(currency, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn brl() -> CurrencyCode {
        CurrencyCode::new("BRL").unwrap()
    }

    #[test]
    fn test_parse_rows_newest_first() {
        let body = r#"{
            "data": [
                {"country_currency_desc": "Brazil-Real", "exchange_rate": "4.858",
                 "record_date": "2023-09-30", "effective_date": "2023-09-30"},
                {"country_currency_desc": "Brazil-Real", "exchange_rate": "4.9",
                 "record_date": "2023-12-31", "effective_date": "2023-12-14"}
            ],
            "meta": {"count": 2}
        }"#;

        let observations = parse_rates(body, &brl());

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].rate, dec!(4.9));
        assert_eq!(observations[0].date, NaiveDate::from_ymd_opt(2023, 12, 14).unwrap());
        assert_eq!(
            observations[0].record_date,
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
        assert_eq!(observations[1].rate, dec!(4.858));
    }

    #[test]
    fn test_bad_rows_skipped() {
        let body = r#"{"data": [
            {"exchange_rate": "abc", "record_date": "2023-09-30", "effective_date": "2023-09-30"},
            {"exchange_rate": "0", "record_date": "2023-09-30", "effective_date": "2023-09-30"},
            {"exchange_rate": "4.1", "record_date": "yesterday"},
            {"exchange_rate": null, "record_date": "2023-09-30"},
            {"exchange_rate": "4.2", "record_date": "2023-06-30"}
        ]}"#;

        let observations = parse_rates(body, &brl());

        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].rate, dec!(4.2));
        // Missing effective date falls back to the record date
        assert_eq!(observations[0].date, NaiveDate::from_ymd_opt(2023, 6, 30).unwrap());
    }

    #[test]
    fn test_malformed_or_empty_body_is_no_data() {
        assert!(parse_rates("<html>502</html>", &brl()).is_empty());
        assert!(parse_rates("{}", &brl()).is_empty());
        assert!(parse_rates(r#"{"data": []}"#, &brl()).is_empty());
    }

    #[test]
    fn test_currency_table() {
        assert_eq!(treasury_currency_desc(&brl()), Some("Brazil-Real"));
        assert_eq!(
            treasury_currency_desc(&CurrencyCode::new("eur").unwrap()),
            Some("Euro Zone-Euro")
        );
        assert_eq!(treasury_currency_desc(&CurrencyCode::new("XYZ").unwrap()), None);
    }

    #[tokio::test]
    async fn test_unmapped_currency_skips_network() {
        // Unroutable base URL: a request would fail, so Ok proves none was sent
        let client =
            TreasuryRateClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let xyz = CurrencyCode::new("XYZ").unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert_eq!(client.get_rates_range(&xyz, start).await, Ok(Vec::new()));
        assert_eq!(client.get_rate(&xyz, start).await, Ok(None));
    }
}
