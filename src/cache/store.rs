//! Backing-store contract for session state.

/// `get_expire` result for a key that is absent or already expired
/// (Redis `TTL` convention).
pub const EXPIRE_ABSENT: i64 = -2;

/// Key-value store with per-entry TTL.
///
/// The session layer only depends on this contract, so the bundled
/// [`ExpiringCache`](super::ExpiringCache) can be swapped for an external
/// store (e.g. Redis) without touching resolver or middleware code.
///
/// Implementations must be safe for concurrent use from multiple request
/// tasks; none of the operations may block for longer than a map lookup.
pub trait CacheStore: Send + Sync {
    /// Store `value` under `key`, expiring `ttl_secs` after this write.
    /// Overwrites (and re-times) any existing entry.
    fn put(&self, key: &str, value: String, ttl_secs: u64);

    /// Fetch a live value. Reads never extend the TTL.
    fn get(&self, key: &str) -> Option<String>;

    /// Drop the entry, if present.
    fn remove(&self, key: &str);

    /// Remaining lifetime in seconds, or [`EXPIRE_ABSENT`].
    fn get_expire(&self, key: &str) -> i64;
}
