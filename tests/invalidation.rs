//! Tag-based invalidation through the store and the trigger/consumer wiring.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use tenpin_cache::{
    CacheConfig, CachePlan, CacheSpec, CacheStore, Cacheable, Cached, CancellationToken,
    EventQueue, InvalidationConsumer, InvalidationTrigger, MemoryStore, QueryHandler, keys, tags,
};

const HOUR: Duration = Duration::from_secs(3600);

struct BowlerTitlesQuery {
    bowler_id: String,
}

impl Cacheable for BowlerTitlesQuery {
    fn cache_plan(&self) -> CachePlan {
        CachePlan::Cache(CacheSpec::new(
            keys::query_key("BowlerTitlesQuery", &[self.bowler_id.as_str()]),
            HOUR,
            tags::bowler_tags(&self.bowler_id),
        ))
    }
}

struct ListBowlersQuery;

impl Cacheable for ListBowlersQuery {
    fn cache_plan(&self) -> CachePlan {
        CachePlan::Cache(CacheSpec::new(
            keys::query_key("ListBowlersQuery", &[]),
            HOUR,
            tags::bowlers_tags(),
        ))
    }
}

struct TournamentQuery {
    tournament_id: String,
}

impl Cacheable for TournamentQuery {
    fn cache_plan(&self) -> CachePlan {
        CachePlan::Cache(CacheSpec::new(
            keys::query_key("TournamentQuery", &[self.tournament_id.as_str()]),
            HOUR,
            tags::tournament_tags(&self.tournament_id),
        ))
    }
}

/// Counts invocations per wrapped query type.
struct CountingHandler {
    calls: Arc<AtomicUsize>,
}

impl CountingHandler {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

macro_rules! impl_counting_handler {
    ($query:ty) => {
        #[async_trait]
        impl QueryHandler<$query> for CountingHandler {
            type Output = Result<String, String>;

            async fn handle(&self, _query: &$query, _cancel: &CancellationToken) -> Self::Output {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok("payload".to_string())
            }
        }
    };
}

impl_counting_handler!(BowlerTitlesQuery);
impl_counting_handler!(ListBowlersQuery);
impl_counting_handler!(TournamentQuery);

struct Wiring {
    store: Arc<MemoryStore>,
    trigger: InvalidationTrigger,
}

fn wire() -> Wiring {
    let config = CacheConfig::default();
    let store = Arc::new(MemoryStore::new(&config));
    let queue = Arc::new(EventQueue::new());
    let consumer = Arc::new(InvalidationConsumer::new(
        config.clone(),
        store.clone(),
        queue.clone(),
    ));
    Wiring {
        store,
        trigger: InvalidationTrigger::new(config, queue, consumer),
    }
}

#[tokio::test]
async fn category_tag_invalidation_covers_entity_entries() {
    let Wiring { store, trigger: _ } = wire();
    let cancel = CancellationToken::new();

    let bowler_handler = CountingHandler::new();
    let bowlers = Cached::new(bowler_handler, store.clone());
    let list_handler = CountingHandler::new();
    let lists = Cached::new(list_handler, store.clone());
    let tournament_handler = CountingHandler::new();
    let tournaments = Cached::new(tournament_handler, store.clone());

    let b1 = BowlerTitlesQuery {
        bowler_id: "123".to_string(),
    };
    let b2 = BowlerTitlesQuery {
        bowler_id: "456".to_string(),
    };
    let t1 = TournamentQuery {
        tournament_id: "open-2025".to_string(),
    };

    bowlers.handle(&b1, &cancel).await.unwrap();
    bowlers.handle(&b2, &cancel).await.unwrap();
    lists.handle(&ListBowlersQuery, &cancel).await.unwrap();
    tournaments.handle(&t1, &cancel).await.unwrap();
    assert_eq!(store.len(), 4);

    // Entity entries carry the category tag, so one category invalidation
    // reaches every `website:bowler:*` entry and the list entry.
    store
        .invalidate_tag(&tags::category_tag("website", "bowlers"))
        .await
        .unwrap();

    assert_eq!(store.len(), 1);
    assert!(store.contains(&keys::query_key("TournamentQuery", &["open-2025"])));
}

#[tokio::test]
async fn entity_tag_invalidation_is_precise() {
    let Wiring { store, trigger: _ } = wire();
    let cancel = CancellationToken::new();

    let handler = CountingHandler::new();
    let bowlers = Cached::new(handler, store.clone());

    let b1 = BowlerTitlesQuery {
        bowler_id: "123".to_string(),
    };
    let b2 = BowlerTitlesQuery {
        bowler_id: "456".to_string(),
    };
    bowlers.handle(&b1, &cancel).await.unwrap();
    bowlers.handle(&b2, &cancel).await.unwrap();

    store
        .invalidate_tag(&tags::entity_tag("website", "bowler", "123"))
        .await
        .unwrap();

    assert!(!store.contains(&keys::query_key("BowlerTitlesQuery", &["123"])));
    assert!(store.contains(&keys::query_key("BowlerTitlesQuery", &["456"])));
}

#[tokio::test]
async fn bowler_upsert_trigger_refreshes_cached_titles() {
    let Wiring { store, trigger } = wire();
    let cancel = CancellationToken::new();

    let handler = CountingHandler::new();
    let calls = handler.calls.clone();
    let bowlers = Cached::new(handler, store.clone());

    let query = BowlerTitlesQuery {
        bowler_id: "123".to_string(),
    };

    bowlers.handle(&query, &cancel).await.unwrap();
    bowlers.handle(&query, &cancel).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    trigger.bowler_upserted("123").await;
    assert!(trigger.queue().is_empty());

    // The entry is gone, the next call refills.
    bowlers.handle(&query, &cancel).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn context_tag_invalidation_clears_the_whole_context() {
    let Wiring { store, trigger: _ } = wire();
    let cancel = CancellationToken::new();

    let bowler_handler = CountingHandler::new();
    let bowlers = Cached::new(bowler_handler, store.clone());
    let tournament_handler = CountingHandler::new();
    let tournaments = Cached::new(tournament_handler, store.clone());

    bowlers
        .handle(
            &BowlerTitlesQuery {
                bowler_id: "123".to_string(),
            },
            &cancel,
        )
        .await
        .unwrap();
    tournaments
        .handle(
            &TournamentQuery {
                tournament_id: "open-2025".to_string(),
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(store.len(), 2);

    store
        .invalidate_tag(&tags::context_tag("website"))
        .await
        .unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn flush_all_clears_the_store() {
    let Wiring { store, trigger } = wire();
    let cancel = CancellationToken::new();

    let handler = CountingHandler::new();
    let bowlers = Cached::new(handler, store.clone());
    bowlers
        .handle(
            &BowlerTitlesQuery {
                bowler_id: "123".to_string(),
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(store.len(), 1);

    trigger.flush_all().await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn batched_events_consume_in_one_pass() {
    let Wiring { store, trigger } = wire();
    let cancel = CancellationToken::new();

    let handler = CountingHandler::new();
    let bowlers = Cached::new(handler, store.clone());
    bowlers
        .handle(
            &BowlerTitlesQuery {
                bowler_id: "123".to_string(),
            },
            &cancel,
        )
        .await
        .unwrap();

    // Queue several events without consuming, then drain once.
    trigger
        .trigger(
            tenpin_cache::ChangeKind::BowlerUpserted {
                bowler_id: "123".to_string(),
            },
            false,
        )
        .await;
    trigger
        .trigger(tenpin_cache::ChangeKind::AwardsRecalculated, false)
        .await;
    assert_eq!(trigger.queue().len(), 2);

    assert!(trigger.consumer().consume().await);
    assert!(trigger.queue().is_empty());
    assert!(store.is_empty());
}
