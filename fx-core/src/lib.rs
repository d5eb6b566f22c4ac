//! Shared money and exchange-rate types.
//!
//! - **Value objects**: `Money`, `CurrencyCode`, `ExchangeRateObservation`, `RateBucket`
//! - **Conversion**: `CurrencyConverter`, a pure pivot-currency converter

pub mod conversion;
pub mod error;
pub mod value_objects;

pub use conversion::CurrencyConverter;
pub use error::{ConversionError, MoneyError};
pub use value_objects::{
    CurrencyCode, ExchangeRateObservation, MONEY_DECIMALS, Money, RateBucket, round_money,
};
