//! Cacheable-query capability.
//!
//! A query type opts into caching by overriding [`Cacheable::cache_plan`]
//! to return a [`CacheSpec`]. Queries that keep the default plan are never
//! cached and pay no key or tag construction cost.

use std::time::Duration;

use crate::keys::CacheKey;
use crate::tags::Tag;

/// Where and for how long a cacheable query's result lives.
#[derive(Debug, Clone)]
pub struct CacheSpec {
    /// Store key, a pure function of the query type and parameters.
    pub key: CacheKey,
    /// Absolute time-to-live from first write.
    pub ttl: Duration,
    /// Invalidation tags, coarsest first. Never empty.
    pub tags: Vec<Tag>,
}

impl CacheSpec {
    /// `tags` must contain at least one tag; an untagged entry could never
    /// be bulk-invalidated.
    pub fn new(key: CacheKey, ttl: Duration, tags: Vec<Tag>) -> Self {
        debug_assert!(!tags.is_empty(), "cache spec requires at least one tag");
        Self { key, ttl, tags }
    }
}

/// Caching decision for one query instance.
#[derive(Debug, Clone)]
pub enum CachePlan {
    /// Serve through the cache with this spec.
    Cache(CacheSpec),
    /// Always delegate to the inner handler.
    Bypass,
}

/// Capability a query type implements to opt into caching.
pub trait Cacheable {
    fn cache_plan(&self) -> CachePlan {
        CachePlan::Bypass
    }
}
