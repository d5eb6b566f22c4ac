pub mod ports;
pub mod services;
pub mod use_cases;

pub use ports::{
    CacheError, PurchaseStore, RateCache, RateSource, RateSourceError, StoreError,
};
pub use services::{ExchangeRateResolver, RatePolicy, ResolveError, ResolvedRate};
pub use use_cases::{
    ConvertedPurchase, ConvertedPurchaseError, CreatePurchaseCommand, CreatePurchaseError,
    CreatePurchaseResult, CreatePurchaseUseCase, GetConvertedPurchaseUseCase, GetPurchaseError,
    GetPurchaseUseCase,
};
