//! Tenpin query caching.
//!
//! Read-query caching layer for the league website:
//!
//! - **Key/tag grammar** ([`keys`], [`tags`]): colon-delimited keys and a
//!   three-level tag hierarchy for bulk invalidation
//! - **Outcome abstraction** ([`Outcome`]): generic success-or-error
//!   unwrapping so failures are never cached
//! - **Cacheable capability** ([`Cacheable`]): queries opt in with a key,
//!   a TTL, and invalidation tags
//! - **Caching decorator** ([`Cached`], [`CachedValue`]): wraps any
//!   handler with get-or-create semantics and at-most-once execution
//! - **Invalidation toolkit** ([`InvalidationTrigger`],
//!   [`InvalidationConsumer`]): change events from write paths mapped to
//!   tag invalidations
//!
//! ## Composition
//!
//! Handlers are wrapped explicitly at startup:
//!
//! ```ignore
//! let config = CacheConfig::default();
//! let store = Arc::new(MemoryStore::new(&config));
//! let titles = Cached::new(BowlerTitlesHandler::new(repo), store.clone());
//! ```
//!
//! Caching is transparent to callers: a hit and a freshly computed success
//! are indistinguishable in shape and content.

mod cached;
mod config;
mod consumer;
mod error;
mod events;
mod handler;
pub mod keys;
mod lock;
mod memory;
mod outcome;
mod query;
mod store;
pub mod tags;
mod telemetry;
mod trigger;

pub use cached::{Cached, CachedValue};
pub use config::CacheConfig;
pub use consumer::InvalidationConsumer;
pub use error::CacheError;
pub use events::{ChangeEvent, ChangeKind, Epoch, EventQueue};
pub use handler::QueryHandler;
pub use keys::CacheKey;
pub use memory::MemoryStore;
pub use outcome::Outcome;
pub use query::{CachePlan, CacheSpec, Cacheable};
pub use store::{CacheStore, Payload, PayloadFactory};
pub use tags::Tag;
pub use telemetry::describe_metrics;
pub use trigger::InvalidationTrigger;

/// Re-exported cooperative abort signal threaded through handlers and
/// stores.
pub use tokio_util::sync::CancellationToken;
