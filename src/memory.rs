//! In-process reference cache store.
//!
//! LRU-bounded entries with absolute TTL, a bidirectional tag index for
//! bulk invalidation, and per-key flight locks so concurrent callers for
//! the same key collapse into a single factory run.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use lru::LruCache;
use metrics::counter;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::keys::CacheKey;
use crate::lock::{rw_read, rw_write};
use crate::store::{CacheStore, Payload, PayloadFactory};
use crate::tags::Tag;
use crate::telemetry::{METRIC_EVICT_TOTAL, METRIC_INVALIDATE_TOTAL};

const SOURCE: &str = "memory_store";

struct StoredEntry {
    payload: Payload,
    expires_at: Instant,
    tags: Vec<Tag>,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory [`CacheStore`] with LRU capacity bounds.
///
/// Never produces the no-value sentinel shape: a factory result of `None`
/// stores nothing, and absent keys run the factory.
pub struct MemoryStore {
    // Lock order: `entries` before `tag_index`, everywhere.
    entries: RwLock<LruCache<CacheKey, StoredEntry>>,
    tag_index: RwLock<HashMap<Tag, HashSet<CacheKey>>>,
    flights: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl MemoryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.entry_limit_non_zero())),
            tag_index: RwLock::new(HashMap::new()),
            flights: DashMap::new(),
        }
    }

    /// Number of live entries, expired ones included until their next read.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a fresh entry exists without touching LRU recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        rw_read(&self.entries, SOURCE, "contains")
            .peek(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    fn read_fresh(&self, key: &CacheKey) -> Option<Payload> {
        let mut entries = rw_write(&self.entries, SOURCE, "read_fresh");
        let state = entries.get(key).map(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.payload.clone())
            }
        });
        match state {
            None => None,
            Some(Some(payload)) => Some(payload),
            Some(None) => {
                if let Some(stale) = entries.pop(key) {
                    let mut index = rw_write(&self.tag_index, SOURCE, "read_fresh.index");
                    unregister(&mut index, key, &stale.tags);
                }
                None
            }
        }
    }

    fn write(&self, key: &CacheKey, payload: Payload, ttl: Duration, tags: &[Tag]) {
        let entry = StoredEntry {
            payload,
            expires_at: Instant::now() + ttl,
            tags: tags.to_vec(),
        };
        let mut entries = rw_write(&self.entries, SOURCE, "write.entries");
        let mut index = rw_write(&self.tag_index, SOURCE, "write.index");
        if let Some((displaced_key, displaced)) = entries.push(key.clone(), entry) {
            // Same-key replacement surfaces here too; only a different key
            // is a capacity eviction.
            unregister(&mut index, &displaced_key, &displaced.tags);
            if displaced_key != *key {
                counter!(METRIC_EVICT_TOTAL).increment(1);
                debug!(key = %key, evicted = %displaced_key, "capacity eviction");
            }
        }
        for tag in tags {
            index.entry(tag.clone()).or_default().insert(key.clone());
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get_or_create(
        &self,
        key: &CacheKey,
        ttl: Duration,
        tags: &[Tag],
        cancel: &CancellationToken,
        factory: PayloadFactory<'_>,
    ) -> Result<Option<Payload>, CacheError> {
        if let Some(payload) = self.read_fresh(key) {
            return Ok(Some(payload));
        }

        // Single flight per key. Clone the lock out so no map shard guard
        // is held across an await.
        let flight = self.flights.entry(key.clone()).or_default().clone();
        let guard = flight.lock().await;

        // A concurrent caller may have filled the entry while we waited.
        if let Some(payload) = self.read_fresh(key) {
            return Ok(Some(payload));
        }

        let produced = factory().await;

        let result = match produced {
            None => Ok(None),
            Some(payload) => {
                if cancel.is_cancelled() {
                    // Do not persist work that finished after cancellation.
                    debug!(key = %key, "cancelled during factory, skipping write");
                } else {
                    self.write(key, payload.clone(), ttl, tags);
                }
                Ok(Some(payload))
            }
        };

        drop(guard);
        // Waiters still holding the old lock finish on their own.
        self.flights.remove(key);
        result
    }

    async fn invalidate_tag(&self, tag: &Tag) -> Result<(), CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_tag.entries");
        let mut index = rw_write(&self.tag_index, SOURCE, "invalidate_tag.index");
        let Some(keys) = index.remove(tag) else {
            return Ok(());
        };
        let mut dropped: u64 = 0;
        for key in keys {
            if let Some(entry) = entries.pop(&key) {
                dropped += 1;
                for other in &entry.tags {
                    if other == tag {
                        continue;
                    }
                    if let Some(set) = index.get_mut(other) {
                        set.remove(&key);
                        if set.is_empty() {
                            index.remove(other);
                        }
                    }
                }
            }
        }
        counter!(METRIC_INVALIDATE_TOTAL).increment(dropped);
        debug!(tag = %tag, dropped, "invalidated entries by tag");
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "clear.entries");
        let mut index = rw_write(&self.tag_index, SOURCE, "clear.index");
        entries.clear();
        index.clear();
        Ok(())
    }
}

fn unregister(index: &mut HashMap<Tag, HashSet<CacheKey>>, key: &CacheKey, tags: &[Tag]) {
    for tag in tags {
        if let Some(set) = index.get_mut(tag) {
            set.remove(key);
            if set.is_empty() {
                index.remove(tag);
            }
        }
    }
}
