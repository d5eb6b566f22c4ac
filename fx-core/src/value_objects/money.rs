//! Monetary amounts with a fixed two-decimal scale
//!
//! Every amount is rounded half away from zero to [`MONEY_DECIMALS`] places at
//! construction and carried at that scale, so `150` and `150.00` render identically.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MoneyError;

/// Number of decimal places money amounts are held at
pub const MONEY_DECIMALS: u32 = 2;

/// Round to two places, half away from zero, and pin the scale to two places.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_DECIMALS);
    rounded
}

/// ISO-4217 style currency code, normalized to uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(value: impl AsRef<str>) -> Result<Self, MoneyError> {
        let trimmed = value.as_ref().trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MoneyError::InvalidCurrency(value.as_ref().to_string()));
        }
        Ok(CurrencyCode(trimmed.to_ascii_uppercase()))
    }

    /// United States dollar, the default pivot currency
    pub fn usd() -> Self {
        CurrencyCode("USD".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for CurrencyCode {
    type Error = MoneyError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        CurrencyCode::new(value)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = MoneyError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        CurrencyCode::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> String {
        code.0
    }
}

/// An immutable amount of a single currency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

impl Money {
    /// Create a positive amount. The amount is rounded before the positivity check,
    /// so anything below half a cent is rejected.
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Result<Self, MoneyError> {
        let amount = round_money(amount);
        if amount <= Decimal::ZERO {
            return Err(MoneyError::NonPositiveAmount(amount));
        }
        Ok(Money { amount, currency })
    }

    /// Parse both the amount and the currency code
    pub fn parse(amount: Decimal, currency: &str) -> Result<Self, MoneyError> {
        Money::new(amount, CurrencyCode::new(currency)?)
    }

    /// The zero sentinel. Never persisted.
    pub fn empty(currency: CurrencyCode) -> Self {
        Money {
            amount: round_money(Decimal::ZERO),
            currency,
        }
    }

    /// Rounded result of a conversion. Unlike [`Money::new`] this accepts an amount
    /// that rounds to zero: a tiny source amount at a small rate is still a valid report.
    pub(crate) fn converted(amount: Decimal, currency: CurrencyCode) -> Self {
        Money {
            amount: round_money(amount),
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
