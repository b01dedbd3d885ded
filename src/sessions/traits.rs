//! Storage backend seam for the session store.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value/list primitives the session history protocol is built on.
///
/// Each method maps to a single backend round trip and is atomic on its own;
/// the store composes them without any cross-call atomicity (see
/// [`super::SessionStore`]). Implementations must be cheap to clone behind an
/// `Arc` and safe to call from many request handlers at once.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Liveness check against the backend.
    async fn ping(&self) -> Result<()>;

    /// Push a value onto the head of the list at `key`, creating it if absent.
    async fn push_front(&self, key: &str, value: &str) -> Result<()>;

    /// Truncate the list at `key` to its first `max_len` entries, discarding
    /// the tail. A no-op if the list is already within bounds or absent.
    async fn trim_front(&self, key: &str, max_len: usize) -> Result<()>;

    /// All entries of the list at `key`, head first. Absent list → empty.
    async fn list_range(&self, key: &str) -> Result<Vec<String>>;

    /// Length of the list at `key`. Absent list → 0.
    async fn list_len(&self, key: &str) -> Result<u64>;

    /// The string value at `key`, if present.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Set `key` to `value` with a time-to-live, replacing any prior value
    /// and expiry.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Reset the time-to-live on an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Delete the given keys in one request, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// All live keys matching `pattern` (`*` wildcard). Linear in the number
    /// of tracked keys; intended for administrative enumeration only.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// The name of this backend implementation.
    fn name(&self) -> &str;
}
