//! Cache Module
//!
//! Provides an in-memory response cache with TTL expiration and LRU eviction.

mod entry;
mod lru;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::{RecencyList, SlotId};
pub use shared::SharedCache;
pub use stats::CacheStats;
pub use store::CacheStore;
