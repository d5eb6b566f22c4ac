mod rate_resolver;

pub use rate_resolver::{ExchangeRateResolver, RatePolicy, ResolveError, ResolvedRate};
