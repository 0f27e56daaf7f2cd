//! The batch fetch function contract.

use std::future::Future;

use async_trait::async_trait;

/// Bulk lookup used by a `BatchLoader` to resolve a batch of keys.
///
/// Given `N` keys, an implementation returns exactly `N` results in the same
/// order: `Ok(value)` or a per-key `Err`. Returning `Err` from the call itself
/// fails every key of the batch.
#[async_trait]
pub trait BatchFn<K, V>: Send + Sync + 'static {
    /// Error reported for a single key or for the whole call.
    type Error: Send + Sync + 'static;

    /// Loads the values for `keys`, preserving their order.
    async fn load(&self, keys: &[K]) -> Result<Vec<Result<V, Self::Error>>, Self::Error>;
}

/// Adapts an async closure into a [`BatchFn`].
///
/// Created by [`batch_fn`].
#[derive(Debug, Clone)]
pub struct FnBatch<F>(F);

/// Wraps `f` so it can be handed to a loader as its fetch function.
///
/// ```rust,ignore
/// let fetcher = batch_fn(|ids: Vec<u64>| async move {
///     Ok::<_, MyError>(ids.into_iter().map(|id| Ok(id.to_string())).collect())
/// });
/// ```
pub fn batch_fn<F>(f: F) -> FnBatch<F> {
    FnBatch(f)
}

#[async_trait]
impl<K, V, E, F, Fut> BatchFn<K, V> for FnBatch<F>
where
    K: Clone + Send + Sync + 'static,
    V: Send + 'static,
    E: Send + Sync + 'static,
    F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Result<V, E>>, E>> + Send,
{
    type Error = E;

    async fn load(&self, keys: &[K]) -> Result<Vec<Result<V, E>>, E> {
        (self.0)(keys.to_vec()).await
    }
}
