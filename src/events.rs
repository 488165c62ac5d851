//! Change event system.
//!
//! Write paths publish domain change events; the consumer turns them into
//! tag invalidations against the store.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::gauge;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::lock::mutex_lock;
use crate::telemetry::METRIC_EVENT_QUEUE_LEN;

const SOURCE: &str = "events";

/// Monotonic ordering number, unique per event within this process.
pub type Epoch = u64;

/// A domain change with idempotency and ordering support.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Unique identifier for idempotency (UUIDv4).
    pub id: Uuid,
    /// Monotonic epoch for ordering within this process.
    pub epoch: Epoch,
    /// What changed.
    pub kind: ChangeKind,
    /// When the event was created.
    pub timestamp: OffsetDateTime,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Domain changes that trigger cache invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// A document was created or updated.
    DocUpserted { slug: String },
    /// A document was deleted.
    DocDeleted { slug: String },
    /// A bowler was created or updated.
    BowlerUpserted { bowler_id: String },
    /// A bowler was deleted.
    BowlerDeleted { bowler_id: String },
    /// A tournament was created or updated.
    TournamentUpserted { tournament_id: String },
    /// A tournament was deleted.
    TournamentDeleted { tournament_id: String },
    /// Award standings were recalculated.
    AwardsRecalculated,
    /// A background job finished and its result pages changed.
    JobCompleted { job: String },
    /// Drop every cached entry.
    FlushAll,
}

/// In-memory FIFO queue of change events.
///
/// A mutex is enough here, contention is expected to be low.
pub struct EventQueue {
    queue: Mutex<VecDeque<ChangeEvent>>,
    epoch_counter: AtomicU64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    /// Next epoch number.
    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish an event to the queue.
    pub fn publish(&self, kind: ChangeKind) {
        let epoch = self.next_epoch();
        let event = ChangeEvent::new(kind.clone(), epoch);

        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            change = ?kind,
            "change event enqueued"
        );

        let mut queue = mutex_lock(&self.queue, SOURCE, "publish");
        queue.push_back(event);
        gauge!(METRIC_EVENT_QUEUE_LEN).set(queue.len() as f64);
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<ChangeEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        let drained = queue.drain(..count).collect();
        gauge!(METRIC_EVENT_QUEUE_LEN).set(queue.len() as f64);
        drained
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.queue, SOURCE, "clear").clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn event_carries_epoch_and_id() {
        let event = ChangeEvent::new(ChangeKind::AwardsRecalculated, 42);
        assert_eq!(event.epoch, 42);
        assert!(!event.id.is_nil());
    }

    #[test]
    fn epochs_are_monotonic() {
        let queue = EventQueue::new();
        let a = queue.next_epoch();
        let b = queue.next_epoch();
        let c = queue.next_epoch();
        assert!(a < b && b < c);
    }

    #[test]
    fn publish_and_drain_fifo() {
        let queue = EventQueue::new();
        queue.publish(ChangeKind::AwardsRecalculated);
        queue.publish(ChangeKind::BowlerUpserted {
            bowler_id: "123".to_string(),
        });
        queue.publish(ChangeKind::FlushAll);
        assert_eq!(queue.len(), 3);

        let events = queue.drain(2);
        assert_eq!(events.len(), 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::AwardsRecalculated);
        assert!(matches!(
            events[1].kind,
            ChangeKind::BowlerUpserted { .. }
        ));
    }

    #[test]
    fn drain_more_than_available() {
        let queue = EventQueue::new();
        queue.publish(ChangeKind::FlushAll);
        let events = queue.drain(100);
        assert_eq!(events.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn queue_recovers_from_poisoned_lock() {
        let queue = EventQueue::new();
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = queue.queue.lock().expect("queue lock should be acquired");
            panic!("poison queue lock");
        }));

        queue.publish(ChangeKind::AwardsRecalculated);
        assert_eq!(queue.len(), 1);
    }
}
