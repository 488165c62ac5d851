//! Query handler seam.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// An async handler for a read query.
///
/// `Output` is either a bare value or a success-or-error outcome; the
/// caching layer covers the two shapes with [`Cached`](crate::Cached) and
/// [`CachedValue`](crate::CachedValue) respectively.
#[async_trait]
pub trait QueryHandler<Q>: Send + Sync {
    type Output: Send;

    /// Execute the query. `cancel` is the cooperative abort signal and is
    /// threaded through to downstream I/O.
    async fn handle(&self, query: &Q, cancel: &CancellationToken) -> Self::Output;
}
