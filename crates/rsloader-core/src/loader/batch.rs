//! Execution and settlement of a single dispatched batch.

use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, Instrument};

use super::LoaderInner;
use crate::error::{LoadError, LoadResult};
use crate::fetch::BatchFn;
use crate::handle::{LoadHandle, Settler};

/// A load waiting in the pending queue.
pub(super) struct PendingLoad<K, V, E> {
    pub(super) key: K,
    /// Handle given to callers, used to tell whether the cache still holds it.
    pub(super) handle: LoadHandle<V, E>,
    pub(super) settler: Settler<V, E>,
}

impl<K, V, F> LoaderInner<K, V, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: BatchFn<K, V>,
{
    /// Fetches one batch and settles each of its handles.
    ///
    /// Result `i` settles load `i`. A failed call or a result count that does
    /// not match the key count settles every load with the same error.
    pub(super) async fn run_batch(&self, batch: Vec<PendingLoad<K, V, F::Error>>) {
        let mut keys = Vec::with_capacity(batch.len());
        let mut handles = Vec::with_capacity(batch.len());
        let mut settlers = Vec::with_capacity(batch.len());
        for pending in batch {
            keys.push(pending.key);
            handles.push(pending.handle);
            settlers.push(pending.settler);
        }

        let guard = BatchGuard::new(self, keys, handles);
        let expected = guard.keys.len();
        let name = &self.config.name;

        self.metrics.batches.increment(1);
        self.metrics.batch_size.record(expected as f64);

        let span = tracing::debug_span!("batch_fetch", loader = %name, keys = expected);
        let outcome = self.fetcher.load(&guard.keys).instrument(span).await;
        let results = settle_results(outcome, expected);

        let failed = results.iter().filter(|result| result.is_err()).count();
        guard.complete(&results);
        debug!(loader = %name, keys = expected, failed, "batch settled");

        for (settler, result) in settlers.into_iter().zip(results) {
            // Every handle for this key may already be gone
            let _ = settler.send(result);
        }
    }
}

/// Maps a fetch outcome to one result per key.
fn settle_results<V, E>(
    outcome: Result<Vec<Result<V, E>>, E>,
    expected: usize,
) -> Vec<LoadResult<V, E>>
where
    V: Clone,
{
    match outcome {
        Ok(values) if values.len() == expected => values
            .into_iter()
            .map(|value| value.map_err(|err| LoadError::Key(Arc::new(err))))
            .collect(),
        Ok(values) => {
            let err = LoadError::ContractViolation {
                expected,
                actual: values.len(),
            };
            vec![Err(err); expected]
        }
        Err(err) => vec![Err(LoadError::Batch(Arc::new(err))); expected],
    }
}

/// RAII guard that evicts a batch's failed keys from the cache.
///
/// On the normal path only keys that settled with an error are evicted. If
/// the batch is dropped before completing (e.g. the fetch panicked) every
/// key is evicted, since its handles will settle as abandoned.
///
/// A key is only evicted while the cache still holds this batch's handle,
/// so a re-primed or re-loaded entry is left alone.
struct BatchGuard<'a, K, V, F>
where
    K: Eq + Hash,
    V: Clone,
    F: BatchFn<K, V>,
{
    inner: &'a LoaderInner<K, V, F>,
    keys: Vec<K>,
    handles: Vec<LoadHandle<V, F::Error>>,
    completed: bool,
}

impl<'a, K, V, F> BatchGuard<'a, K, V, F>
where
    K: Eq + Hash,
    V: Clone,
    F: BatchFn<K, V>,
{
    fn new(
        inner: &'a LoaderInner<K, V, F>,
        keys: Vec<K>,
        handles: Vec<LoadHandle<V, F::Error>>,
    ) -> Self {
        Self {
            inner,
            keys,
            handles,
            completed: false,
        }
    }

    /// Mark as completed, evicting keys whose result is an error.
    fn complete(mut self, results: &[LoadResult<V, F::Error>]) {
        self.evict(|index| results.get(index).map_or(true, Result::is_err));
        self.completed = true;
    }

    fn evict(&self, should_evict: impl Fn(usize) -> bool) {
        if !self.inner.config.cache_enabled {
            return;
        }
        let mut state = self.inner.state.lock();
        for (index, (key, handle)) in self.keys.iter().zip(&self.handles).enumerate() {
            if !should_evict(index) {
                continue;
            }
            if state
                .cache
                .get(key)
                .is_some_and(|cached| cached.ptr_eq(handle))
            {
                state.cache.remove(key);
            }
        }
    }
}

impl<K, V, F> Drop for BatchGuard<'_, K, V, F>
where
    K: Eq + Hash,
    V: Clone,
    F: BatchFn<K, V>,
{
    fn drop(&mut self) {
        if !self.completed {
            self.evict(|_| true);
        }
    }
}
