//! Request deduplication and the freshness-validated response cache.

pub mod dedupe;
pub mod fresh;
pub mod persistent;
pub mod store;

pub use dedupe::Deduplicator;
pub use fresh::{FreshCache, Scope, StatusSource};
pub use persistent::{CacheEntry, PersistentCache, ReadOutcome, WriteOutcome};
pub use store::{FileStore, KvStore, MemoryStore, StoreError};
