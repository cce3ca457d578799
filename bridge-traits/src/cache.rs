//! Shared Cache Abstraction
//!
//! The host owns the cache backend (SQLite table, on-disk blobs, in-memory map).
//! The core only relies on a byte-oriented key/value contract with a maximum
//! entry age expressed in days.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Shared response cache trait
///
/// Implementations must treat entries older than the `max_age_days` they were
/// stored with as absent. Payloads are opaque to the store; callers that need
/// freshness tags encode them inside the payload.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::cache::CacheStore;
///
/// async fn remember(cache: &dyn CacheStore, key: &str, payload: Bytes) -> Result<()> {
///     if cache.get(key).await?.is_none() {
///         cache.set(key, payload, 7).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Retrieve a live (non-expired) entry
    ///
    /// Returns `Ok(None)` if the key is unknown or the entry has expired.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store an entry, replacing any previous value for the key
    async fn set(&self, key: &str, value: Bytes, max_age_days: u32) -> Result<()>;

    /// Remove an entry
    async fn delete(&self, key: &str) -> Result<()>;
}
