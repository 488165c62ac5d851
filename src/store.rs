//! Cache store port.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::CacheError;
use crate::keys::CacheKey;
use crate::tags::Tag;

/// Type-erased cached payload.
///
/// Values cross the store boundary as JSON so no store implementation
/// needs compile-time knowledge of handler value types.
pub type Payload = serde_json::Value;

/// Factory invoked by the store when no fresh entry exists.
///
/// Returning `None` tells the store to cache nothing for this call.
pub type PayloadFactory<'a> = Box<dyn FnOnce() -> BoxFuture<'a, Option<Payload>> + Send + 'a>;

/// Get-or-create cache store with tag-based bulk invalidation.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Return the payload under `key`, running `factory` to produce it on a
    /// miss.
    ///
    /// Entries are written with `ttl` measured from first write and
    /// associated with every tag in `tags`. `Ok(None)` means no payload
    /// exists and none was cached: either the factory declined to produce
    /// one, or the store holds a no-value sentinel for this key.
    async fn get_or_create(
        &self,
        key: &CacheKey,
        ttl: Duration,
        tags: &[Tag],
        cancel: &CancellationToken,
        factory: PayloadFactory<'_>,
    ) -> Result<Option<Payload>, CacheError>;

    /// Drop every entry carrying `tag`.
    async fn invalidate_tag(&self, tag: &Tag) -> Result<(), CacheError>;

    /// Drop all entries.
    async fn clear(&self) -> Result<(), CacheError>;
}
