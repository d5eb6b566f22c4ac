mod in_memory_rate_cache;

pub use in_memory_rate_cache::InMemoryRateCache;
