mod purchase_store;
mod rate_cache;
mod rate_source;

pub use purchase_store::{PurchaseStore, StoreError};
pub use rate_cache::{CacheError, RateCache};
pub use rate_source::{RateSource, RateSourceError};
