//! Metric registration.
//!
//! The crate records against whatever recorder the embedding application
//! installs; nothing here sets one up.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

pub(crate) const METRIC_HIT_TOTAL: &str = "tenpin_cache_hit_total";
pub(crate) const METRIC_MISS_TOTAL: &str = "tenpin_cache_miss_total";
pub(crate) const METRIC_BYPASS_TOTAL: &str = "tenpin_cache_bypass_total";
pub(crate) const METRIC_EVICT_TOTAL: &str = "tenpin_cache_evict_total";
pub(crate) const METRIC_INVALIDATE_TOTAL: &str = "tenpin_cache_invalidate_total";
pub(crate) const METRIC_STORE_ERROR_TOTAL: &str = "tenpin_cache_store_error_total";
pub(crate) const METRIC_EVENT_QUEUE_LEN: &str = "tenpin_cache_event_queue_len";
pub(crate) const METRIC_CONSUME_MS: &str = "tenpin_cache_consume_ms";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Register metric descriptions with the installed recorder.
///
/// Safe to call more than once.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT_TOTAL,
            Unit::Count,
            "Cached values served by the decorator."
        );
        describe_counter!(
            METRIC_MISS_TOTAL,
            Unit::Count,
            "Decorator calls that executed the inner handler."
        );
        describe_counter!(
            METRIC_BYPASS_TOTAL,
            Unit::Count,
            "Decorator calls for non-cacheable queries."
        );
        describe_counter!(
            METRIC_EVICT_TOTAL,
            Unit::Count,
            "Store entries evicted by capacity."
        );
        describe_counter!(
            METRIC_INVALIDATE_TOTAL,
            Unit::Count,
            "Store entries removed by tag invalidation."
        );
        describe_counter!(
            METRIC_STORE_ERROR_TOTAL,
            Unit::Count,
            "Store failures and corrupt payloads handled by fallback."
        );
        describe_gauge!(
            METRIC_EVENT_QUEUE_LEN,
            Unit::Count,
            "Pending change events awaiting consumption."
        );
        describe_histogram!(
            METRIC_CONSUME_MS,
            Unit::Milliseconds,
            "Invalidation batch latency in milliseconds."
        );
    });
}
