//! Invalidation consumer.
//!
//! Drains change events from the queue, merges them into a deduplicated
//! set of tags, and applies the invalidations against the store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::events::{ChangeKind, EventQueue};
use crate::keys::CONTEXT_WEBSITE;
use crate::store::CacheStore;
use crate::tags::{Tag, category_tag, entity_tag, nouns};
use crate::telemetry::METRIC_CONSUME_MS;

/// Consumes change events and keeps the store consistent.
pub struct InvalidationConsumer {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
    queue: Arc<EventQueue>,
}

impl InvalidationConsumer {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>, queue: Arc<EventQueue>) -> Self {
        Self {
            config,
            store,
            queue,
        }
    }

    /// Consume one batch of pending events.
    ///
    /// Returns true if any events were processed.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> bool {
        let started_at = Instant::now();
        let events = self.queue.drain(self.config.consume_batch_limit);
        if events.is_empty() {
            return false;
        }

        let event_count = events.len();
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();

        let mut seen = HashSet::new();
        let mut tags: Vec<Tag> = Vec::new();
        let mut flush_all = false;
        for event in events {
            if !seen.insert(event.id) {
                continue;
            }
            if event.kind == ChangeKind::FlushAll {
                flush_all = true;
                continue;
            }
            for tag in tags_for(&event.kind) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }

        info!(
            event_count,
            event_ids = ?event_ids,
            tag_count = tags.len(),
            flush_all,
            "invalidation batch starting"
        );

        if flush_all {
            if let Err(err) = self.store.clear().await {
                warn!(error = %err, "store clear failed");
            }
        } else {
            for tag in &tags {
                if let Err(err) = self.store.invalidate_tag(tag).await {
                    warn!(tag = %tag, error = %err, "tag invalidation failed");
                }
            }
        }

        histogram!(METRIC_CONSUME_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        true
    }
}

/// Tag levels to invalidate for one change.
///
/// List entries carry only the category level, so an entity change
/// invalidates both the entity tag and the category tag.
fn tags_for(kind: &ChangeKind) -> Vec<Tag> {
    match kind {
        ChangeKind::DocUpserted { slug } | ChangeKind::DocDeleted { slug } => {
            entity_and_category(nouns::DOCS, slug)
        }
        ChangeKind::BowlerUpserted { bowler_id } | ChangeKind::BowlerDeleted { bowler_id } => {
            entity_and_category(nouns::BOWLERS, bowler_id)
        }
        ChangeKind::TournamentUpserted { tournament_id }
        | ChangeKind::TournamentDeleted { tournament_id } => {
            entity_and_category(nouns::TOURNAMENTS, tournament_id)
        }
        ChangeKind::AwardsRecalculated => {
            vec![category_tag(CONTEXT_WEBSITE, nouns::AWARDS.0)]
        }
        ChangeKind::JobCompleted { job } => entity_and_category(nouns::JOBS, job),
        ChangeKind::FlushAll => Vec::new(),
    }
}

fn entity_and_category((category, entity): (&str, &str), id: &str) -> Vec<Tag> {
    vec![
        entity_tag(CONTEXT_WEBSITE, entity, id),
        category_tag(CONTEXT_WEBSITE, category),
    ]
}
