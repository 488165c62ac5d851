//! Caching decorator for query handlers.
//!
//! Wraps any [`QueryHandler`] and serves cacheable queries through a
//! [`CacheStore`] get-or-create. Error outcomes are never written to the
//! store, and the inner handler runs at most once per call on every path.
//!
//! Composition is explicit: wrap each handler instance at startup, there is
//! no registry or container involved.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::handler::QueryHandler;
use crate::lock::mutex_lock;
use crate::outcome::Outcome;
use crate::query::{CachePlan, CacheSpec, Cacheable};
use crate::store::{CacheStore, PayloadFactory};
use crate::telemetry::{
    METRIC_BYPASS_TOTAL, METRIC_HIT_TOTAL, METRIC_MISS_TOTAL, METRIC_STORE_ERROR_TOTAL,
};

const SOURCE: &str = "cached";

/// Decorator for handlers returning a success-or-error outcome.
///
/// On a miss the inner handler runs inside the store factory. An error
/// outcome is remembered locally and returned without being cached; a
/// success outcome is unwrapped, stored, and returned. On a hit the cached
/// payload is rewrapped into a success outcome.
pub struct Cached<H> {
    inner: H,
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl<H> Cached<H> {
    /// Wrap a handler with the default configuration.
    pub fn new(inner: H, store: Arc<dyn CacheStore>) -> Self {
        Self::with_config(inner, store, CacheConfig::default())
    }

    /// Wrap a handler with an explicit configuration.
    pub fn with_config(inner: H, store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            inner,
            store,
            config,
        }
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }
}

#[async_trait]
impl<Q, H> QueryHandler<Q> for Cached<H>
where
    Q: Cacheable + Send + Sync,
    H: QueryHandler<Q>,
    H::Output: Outcome,
    <H::Output as Outcome>::Value: Serialize + DeserializeOwned + Send,
{
    type Output = H::Output;

    async fn handle(&self, query: &Q, cancel: &CancellationToken) -> H::Output {
        if !self.config.enabled {
            return self.inner.handle(query, cancel).await;
        }

        let spec = match query.cache_plan() {
            CachePlan::Cache(spec) => spec,
            CachePlan::Bypass => {
                counter!(METRIC_BYPASS_TOTAL).increment(1);
                return self.inner.handle(query, cancel).await;
            }
        };
        let CacheSpec { key, ttl, tags } = spec;

        // Populated by the factory, checked before the lookup result.
        // Whatever the factory produced is returned from here, which is
        // what keeps the inner handler at one invocation per call.
        let produced: Mutex<Option<H::Output>> = Mutex::new(None);
        let produced_ref = &produced;
        let key_ref = &key;
        let inner = &self.inner;

        let factory: PayloadFactory<'_> = Box::new(move || {
            Box::pin(async move {
                let outcome = inner.handle(query, cancel).await;
                if outcome.is_error() {
                    *mutex_lock(produced_ref, SOURCE, "factory.remember_error") = Some(outcome);
                    return None;
                }
                let value = outcome.unwrap_value();
                let payload = match serde_json::to_value(&value) {
                    Ok(payload) => Some(payload),
                    Err(err) => {
                        let err = CacheError::serialization(err.to_string());
                        warn!(key = %key_ref, error = %err, "payload not serializable, skipping cache");
                        None
                    }
                };
                *mutex_lock(produced_ref, SOURCE, "factory.remember_value") =
                    Some(H::Output::wrap_value(value));
                payload
            })
        });

        let lookup = self
            .store
            .get_or_create(&key, ttl, &tags, cancel, factory)
            .await;

        if let Some(outcome) = mutex_lock(&produced, SOURCE, "take_produced").take() {
            debug!(key = %key, outcome = "miss", "inner handler executed");
            counter!(METRIC_MISS_TOTAL).increment(1);
            return outcome;
        }

        match lookup {
            Ok(Some(payload)) => match serde_json::from_value(payload) {
                Ok(value) => {
                    debug!(key = %key, outcome = "hit", "serving cached value");
                    counter!(METRIC_HIT_TOTAL).increment(1);
                    H::Output::wrap_value(value)
                }
                Err(err) => {
                    let err = CacheError::deserialization(err.to_string());
                    warn!(key = %key, error = %err, "corrupt cached payload, treating as miss");
                    counter!(METRIC_STORE_ERROR_TOTAL).increment(1);
                    self.inner.handle(query, cancel).await
                }
            },
            Ok(None) => {
                // The store surfaced a stored no-value sentinel without
                // running the factory. Serve it as a miss, uncached.
                debug!(key = %key, outcome = "sentinel", "store returned an empty entry");
                self.inner.handle(query, cancel).await
            }
            Err(err) => {
                warn!(key = %key, error = %err, "cache store unavailable, falling back to handler");
                counter!(METRIC_STORE_ERROR_TOTAL).increment(1);
                self.inner.handle(query, cancel).await
            }
        }
    }
}

/// Decorator for handlers returning a bare value.
///
/// Everything the handler produces is cached as-is; there is no error
/// branch to avoid.
pub struct CachedValue<H> {
    inner: H,
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl<H> CachedValue<H> {
    /// Wrap a handler with the default configuration.
    pub fn new(inner: H, store: Arc<dyn CacheStore>) -> Self {
        Self::with_config(inner, store, CacheConfig::default())
    }

    /// Wrap a handler with an explicit configuration.
    pub fn with_config(inner: H, store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            inner,
            store,
            config,
        }
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }
}

#[async_trait]
impl<Q, H> QueryHandler<Q> for CachedValue<H>
where
    Q: Cacheable + Send + Sync,
    H: QueryHandler<Q>,
    H::Output: Serialize + DeserializeOwned,
{
    type Output = H::Output;

    async fn handle(&self, query: &Q, cancel: &CancellationToken) -> H::Output {
        if !self.config.enabled {
            return self.inner.handle(query, cancel).await;
        }

        let spec = match query.cache_plan() {
            CachePlan::Cache(spec) => spec,
            CachePlan::Bypass => {
                counter!(METRIC_BYPASS_TOTAL).increment(1);
                return self.inner.handle(query, cancel).await;
            }
        };
        let CacheSpec { key, ttl, tags } = spec;

        let produced: Mutex<Option<H::Output>> = Mutex::new(None);
        let produced_ref = &produced;
        let key_ref = &key;
        let inner = &self.inner;

        let factory: PayloadFactory<'_> = Box::new(move || {
            Box::pin(async move {
                let value = inner.handle(query, cancel).await;
                let payload = match serde_json::to_value(&value) {
                    Ok(payload) => Some(payload),
                    Err(err) => {
                        let err = CacheError::serialization(err.to_string());
                        warn!(key = %key_ref, error = %err, "payload not serializable, skipping cache");
                        None
                    }
                };
                *mutex_lock(produced_ref, SOURCE, "factory.remember_value") = Some(value);
                payload
            })
        });

        let lookup = self
            .store
            .get_or_create(&key, ttl, &tags, cancel, factory)
            .await;

        if let Some(value) = mutex_lock(&produced, SOURCE, "take_produced").take() {
            debug!(key = %key, outcome = "miss", "inner handler executed");
            counter!(METRIC_MISS_TOTAL).increment(1);
            return value;
        }

        match lookup {
            Ok(Some(payload)) => match serde_json::from_value(payload) {
                Ok(value) => {
                    debug!(key = %key, outcome = "hit", "serving cached value");
                    counter!(METRIC_HIT_TOTAL).increment(1);
                    value
                }
                Err(err) => {
                    let err = CacheError::deserialization(err.to_string());
                    warn!(key = %key, error = %err, "corrupt cached payload, treating as miss");
                    counter!(METRIC_STORE_ERROR_TOTAL).increment(1);
                    self.inner.handle(query, cancel).await
                }
            },
            Ok(None) => {
                debug!(key = %key, outcome = "sentinel", "store returned an empty entry");
                self.inner.handle(query, cancel).await
            }
            Err(err) => {
                warn!(key = %key, error = %err, "cache store unavailable, falling back to handler");
                counter!(METRIC_STORE_ERROR_TOTAL).increment(1);
                self.inner.handle(query, cancel).await
            }
        }
    }
}
