pub mod entities;
pub mod services;

// Re-export entity types
pub use entities::{
    IdempotencyKey, MAX_DESCRIPTION_LEN, Purchase, PurchaseDetails, PurchaseError, PurchaseId,
};

// Re-export services
pub use services::Clock;

// Re-export shared money types
pub use fx_core::{CurrencyCode, ExchangeRateObservation, Money, RateBucket};
