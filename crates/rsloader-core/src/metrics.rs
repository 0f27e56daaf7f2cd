//! Loader metric names and descriptions.
//!
//! Every metric carries a `loader` label with the configured loader name.

use ::metrics::{Counter, Histogram};

/// Counter incremented when `load` finds its key in the cache.
pub const CACHE_HITS_TOTAL: &str = "rsloader_cache_hits_total";
/// Counter incremented when `load` has to enqueue its key.
pub const CACHE_MISSES_TOTAL: &str = "rsloader_cache_misses_total";
/// Counter incremented for every fetch call.
pub const BATCHES_TOTAL: &str = "rsloader_batches_total";
/// Histogram of keys per fetch call.
pub const BATCH_SIZE: &str = "rsloader_batch_size";

/// Registers loader metrics descriptions.
///
/// Call this function once during application startup to register metric
/// descriptions with the installed metrics recorder. This is optional.
///
/// # Metrics Registered
///
/// - `rsloader_cache_hits_total` - Loads answered from the cache
/// - `rsloader_cache_misses_total` - Loads that had to be fetched
/// - `rsloader_batches_total` - Fetch calls issued
/// - `rsloader_batch_size` - Keys per fetch call (histogram)
pub fn register_loader_metrics() {
    ::metrics::describe_counter!(
        CACHE_HITS_TOTAL,
        "Total number of loads answered from the cache"
    );
    ::metrics::describe_counter!(
        CACHE_MISSES_TOTAL,
        "Total number of loads that were enqueued for fetching"
    );
    ::metrics::describe_counter!(BATCHES_TOTAL, "Total number of batch fetch calls");
    ::metrics::describe_histogram!(BATCH_SIZE, "Number of keys per batch fetch call");
}

/// Metric handles of one loader, registered once when the loader is built.
///
/// Handles bind to the recorder installed at that point.
pub(crate) struct LoaderMetrics {
    pub(crate) cache_hits: Counter,
    pub(crate) cache_misses: Counter,
    pub(crate) batches: Counter,
    pub(crate) batch_size: Histogram,
}

impl LoaderMetrics {
    pub(crate) fn new(loader: &str) -> Self {
        let loader = loader.to_string();
        Self {
            cache_hits: ::metrics::counter!(CACHE_HITS_TOTAL, "loader" => loader.clone()),
            cache_misses: ::metrics::counter!(CACHE_MISSES_TOTAL, "loader" => loader.clone()),
            batches: ::metrics::counter!(BATCHES_TOTAL, "loader" => loader.clone()),
            batch_size: ::metrics::histogram!(BATCH_SIZE, "loader" => loader),
        }
    }
}
