//! Key-value storage behind the response cache.
//!
//! The fetch pipeline only needs three operations with per-key expiry, so
//! any store with atomic `get`/`set`/`expire` fits. Backends:
//! - in-memory (always available, mostly for tests and single-process runs)
//! - Redis (with the "redis" feature)

mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;
pub use store::{AbstractStore, KeyValueStore};
