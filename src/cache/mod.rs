//! Expiring session cache.
//!
//! [`CacheStore`] is the pluggable backing-store contract the session layer
//! talks to; [`ExpiringCache`] is the bundled in-memory implementation with
//! TTL expiry, capacity-bound LRU eviction, optional statistics, an optional
//! loader for miss-populated caches, and asynchronous removal notification.

pub mod expiring;
pub mod store;

pub use expiring::{
    CacheBuilder, CacheError, CacheStats, ExpiringCache, RemovalCause, RemovalNotice,
    StatsSnapshot,
};
pub use store::{CacheStore, EXPIRE_ABSENT};
