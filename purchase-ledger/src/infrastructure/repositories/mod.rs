mod configured;
mod in_memory_purchase;
mod sqlite_purchase;

pub use configured::ConfiguredPurchaseStore;
pub use in_memory_purchase::InMemoryPurchaseStore;
pub use sqlite_purchase::SqlitePurchaseStore;
