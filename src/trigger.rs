//! Invalidation trigger.
//!
//! High-level API for write paths: publish a change event and, by default,
//! consume it immediately.

use std::sync::Arc;

use tracing::debug;

use crate::config::CacheConfig;
use crate::consumer::InvalidationConsumer;
use crate::events::{ChangeKind, EventQueue};

/// Facade over the event queue and consumer.
///
/// Write operations call the convenience methods after a successful
/// mutation:
///
/// ```ignore
/// trigger.bowler_upserted(&bowler.id).await;
/// ```
pub struct InvalidationTrigger {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    consumer: Arc<InvalidationConsumer>,
}

impl InvalidationTrigger {
    pub fn new(
        config: CacheConfig,
        queue: Arc<EventQueue>,
        consumer: Arc<InvalidationConsumer>,
    ) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publish an event and optionally consume immediately.
    ///
    /// With `consume_now` false the event waits for the next explicit
    /// consumption, which write-heavy paths use to batch invalidations.
    pub async fn trigger(&self, kind: ChangeKind, consume_now: bool) {
        if !self.config.enabled {
            debug!(change = ?kind, "invalidation skipped, cache disabled");
            return;
        }

        self.queue.publish(kind);

        if consume_now {
            self.consumer.consume().await;
        }
    }

    pub async fn doc_upserted(&self, slug: &str) {
        self.trigger(
            ChangeKind::DocUpserted {
                slug: slug.to_string(),
            },
            true,
        )
        .await;
    }

    pub async fn doc_deleted(&self, slug: &str) {
        self.trigger(
            ChangeKind::DocDeleted {
                slug: slug.to_string(),
            },
            true,
        )
        .await;
    }

    pub async fn bowler_upserted(&self, bowler_id: &str) {
        self.trigger(
            ChangeKind::BowlerUpserted {
                bowler_id: bowler_id.to_string(),
            },
            true,
        )
        .await;
    }

    pub async fn bowler_deleted(&self, bowler_id: &str) {
        self.trigger(
            ChangeKind::BowlerDeleted {
                bowler_id: bowler_id.to_string(),
            },
            true,
        )
        .await;
    }

    pub async fn tournament_upserted(&self, tournament_id: &str) {
        self.trigger(
            ChangeKind::TournamentUpserted {
                tournament_id: tournament_id.to_string(),
            },
            true,
        )
        .await;
    }

    pub async fn tournament_deleted(&self, tournament_id: &str) {
        self.trigger(
            ChangeKind::TournamentDeleted {
                tournament_id: tournament_id.to_string(),
            },
            true,
        )
        .await;
    }

    pub async fn awards_recalculated(&self) {
        self.trigger(ChangeKind::AwardsRecalculated, true).await;
    }

    pub async fn job_completed(&self, job: &str) {
        self.trigger(
            ChangeKind::JobCompleted {
                job: job.to_string(),
            },
            true,
        )
        .await;
    }

    pub async fn flush_all(&self) {
        self.trigger(ChangeKind::FlushAll, true).await;
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn consumer(&self) -> &Arc<InvalidationConsumer> {
        &self.consumer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn wire(config: CacheConfig) -> InvalidationTrigger {
        let store = Arc::new(MemoryStore::new(&config));
        let queue = Arc::new(EventQueue::new());
        let consumer = Arc::new(InvalidationConsumer::new(
            config.clone(),
            store,
            queue.clone(),
        ));
        InvalidationTrigger::new(config, queue, consumer)
    }

    #[tokio::test]
    async fn trigger_without_consume_leaves_event_queued() {
        let trigger = wire(CacheConfig::default());
        assert!(trigger.queue.is_empty());

        trigger
            .trigger(ChangeKind::AwardsRecalculated, false)
            .await;
        assert_eq!(trigger.queue.len(), 1);
    }

    #[tokio::test]
    async fn disabled_config_publishes_nothing() {
        let trigger = wire(CacheConfig {
            enabled: false,
            ..Default::default()
        });

        trigger.bowler_upserted("123").await;
        assert!(trigger.queue.is_empty());
    }

    #[tokio::test]
    async fn convenience_methods_consume_immediately() {
        let trigger = wire(CacheConfig::default());

        trigger.doc_upserted("about").await;
        trigger.doc_deleted("about").await;
        trigger.bowler_upserted("123").await;
        trigger.bowler_deleted("123").await;
        trigger.tournament_upserted("t1").await;
        trigger.tournament_deleted("t1").await;
        trigger.awards_recalculated().await;
        trigger.job_completed("render").await;
        trigger.flush_all().await;

        assert!(trigger.queue.is_empty());
    }
}
