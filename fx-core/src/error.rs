use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while constructing money and rate values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("Exchange rate must be greater than zero, got {0}")]
    NonPositiveRate(Decimal),
}

/// Errors raised by the currency converter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Invalid exchange rate: {0}")]
    InvalidRate(Decimal),

    #[error("Converting {amount} at rate {rate} overflows")]
    Overflow { amount: Decimal, rate: Decimal },
}
