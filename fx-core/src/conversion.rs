//! Pivot-currency conversion
//!
//! Published rates are "units of foreign currency per one unit of the pivot"
//! (USD by default). Conversions in and out of the pivot use the rate directly.
//!
//! NOTE: between two non-pivot currencies the same single rate is applied to both
//! legs (`amount / rate * rate`), which leaves the amount unchanged and only relabels
//! the currency. Proper cross rates would need a second observation.

use rust_decimal::Decimal;

use crate::error::ConversionError;
use crate::value_objects::{CurrencyCode, Money};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyConverter {
    pivot: CurrencyCode,
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self::new(CurrencyCode::usd())
    }
}

impl CurrencyConverter {
    pub fn new(pivot: CurrencyCode) -> Self {
        Self { pivot }
    }

    pub fn pivot(&self) -> &CurrencyCode {
        &self.pivot
    }

    /// Convert `original` into `target` at `rate`.
    ///
    /// Same-currency conversions return `original` untouched without checking `rate`.
    pub fn convert(
        &self,
        original: &Money,
        rate: Decimal,
        target: &CurrencyCode,
    ) -> Result<Money, ConversionError> {
        if original.currency() == target {
            return Ok(original.clone());
        }
        if rate <= Decimal::ZERO {
            return Err(ConversionError::InvalidRate(rate));
        }

        let amount = original.amount();
        let converted = if *original.currency() == self.pivot {
            amount.checked_mul(rate)
        } else if *target == self.pivot {
            amount.checked_div(rate)
        } else {
            amount.checked_div(rate).and_then(|usd| usd.checked_mul(rate))
        };

        match converted {
            Some(converted) => Ok(Money::converted(converted, target.clone())),
            None => Err(ConversionError::Overflow { amount, rate }),
        }
    }
}
