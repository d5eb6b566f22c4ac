mod money;
mod rate;

pub use money::{CurrencyCode, MONEY_DECIMALS, Money, round_money};
pub use rate::{ExchangeRateObservation, RateBucket};
