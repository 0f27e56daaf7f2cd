//! Batch loader with per-tick coalescing and a per-key value cache.
//!
//! The loader turns many single-key `load` calls into few bulk fetches:
//!
//! 1. **Cache / deduplication**: A key already cached (settled or in flight)
//!    returns the shared handle and never reaches the fetch function again
//! 2. **Coalescing**: Keys loaded within one scheduling tick are fetched
//!    together, in call order
//! 3. **Early flush**: A batch reaching `max_batch_size` is dispatched
//!    immediately and a new batch starts
//!
//! # Scheduling
//!
//! In [`DispatchMode::Auto`] a task's pending keys are dispatched when it
//! first awaits one of their handles, which is the end of its synchronous
//! segment. Every `load` issued before that await lands in the same batch,
//! on any runtime flavor. On a current-thread runtime a dispatch task is
//! also spawned per tick, so keys nobody awaits still get fetched; the task
//! yields once and cannot run before the loading task does.
//!
//! In [`DispatchMode::Manual`] (or when no runtime is running) keys stay
//! pending until the host calls [`BatchLoader::dispatch`].
//!
//! # Errors
//!
//! Keys that settle with an error are evicted from the cache, so the next
//! `load` retries. Clearing a key never cancels a fetch already in flight.

mod batch;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::mem;
use std::sync::{Arc, Weak};

use futures::future::{join_all, JoinAll};
use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::trace;

use crate::config::{DispatchMode, LoaderConfig};
use crate::error::ConfigError;
use crate::fetch::BatchFn;
use crate::handle::{Flush, LoadHandle};
use crate::metrics::LoaderMetrics;

use self::batch::PendingLoad;

/// Mutable loader state, guarded by one mutex that is never held across an await.
struct LoaderState<K, V, E> {
    /// Handles by key, settled or still in flight.
    cache: HashMap<K, LoadHandle<V, E>>,
    /// Loads collected since the last dispatch, in call order.
    pending: Vec<PendingLoad<K, V, E>>,
    /// Whether a dispatch task is already scheduled for this tick.
    dispatch_scheduled: bool,
    /// Bumped every time the pending queue is taken.
    generation: u64,
}

impl<K, V, E> LoaderState<K, V, E> {
    fn take_pending(&mut self) -> Vec<PendingLoad<K, V, E>> {
        self.generation = self.generation.wrapping_add(1);
        mem::take(&mut self.pending)
    }
}

struct LoaderInner<K, V, F>
where
    F: BatchFn<K, V>,
{
    fetcher: F,
    config: LoaderConfig,
    metrics: LoaderMetrics,
    state: Mutex<LoaderState<K, V, F::Error>>,
}

/// Coalescing, caching loader over a batch fetch function.
///
/// Cloning a loader is cheap; clones share the cache and pending queue.
/// Separate loaders (e.g. one per resource type) share nothing.
pub struct BatchLoader<K, V, F>
where
    F: BatchFn<K, V>,
{
    inner: Arc<LoaderInner<K, V, F>>,
}

impl<K, V, F> BatchLoader<K, V, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: BatchFn<K, V>,
{
    /// Creates a loader with the default configuration.
    pub fn new(fetcher: F) -> Self {
        Self::from_parts(fetcher, LoaderConfig::default())
    }

    /// Creates a loader with the given configuration.
    pub fn with_config(fetcher: F, config: LoaderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(fetcher, config))
    }

    fn from_parts(fetcher: F, config: LoaderConfig) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                fetcher,
                metrics: LoaderMetrics::new(&config.name),
                config,
                state: Mutex::new(LoaderState {
                    cache: HashMap::new(),
                    pending: Vec::new(),
                    dispatch_scheduled: false,
                    generation: 0,
                }),
            }),
        }
    }

    /// Returns the configuration for this loader.
    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Loads a single key.
    ///
    /// Returns immediately with a handle; awaiting it yields the value once
    /// the key's batch settles. A cached key returns its existing handle and
    /// triggers no fetch.
    pub fn load(&self, key: K) -> LoadHandle<V, F::Error> {
        let inner = &self.inner;
        let config = &inner.config;
        let mut state = inner.state.lock();

        if config.cache_enabled {
            if let Some(handle) = state.cache.get(&key) {
                inner.metrics.cache_hits.increment(1);
                return handle.clone();
            }
        }
        inner.metrics.cache_misses.increment(1);

        let (settler, mut handle) = LoadHandle::pending();
        if config.dispatch == DispatchMode::Auto {
            let loader = Arc::downgrade(inner);
            let loader: Weak<dyn Flush> = loader;
            handle = handle.flush_on_poll(loader, state.generation);
        }
        if config.cache_enabled {
            state.cache.insert(key.clone(), handle.clone());
        }
        state.pending.push(PendingLoad {
            key,
            handle: handle.clone(),
            settler,
        });

        if config.dispatch == DispatchMode::Manual {
            return handle;
        }
        let Ok(runtime) = Handle::try_current() else {
            trace!(loader = %config.name, "no tokio runtime, key stays pending until dispatch");
            return handle;
        };

        if state.pending.len() >= config.batch_limit() {
            let batch = state.take_pending();
            drop(state);
            trace!(loader = %config.name, keys = batch.len(), "batch full, dispatching early");
            let inner = Arc::clone(inner);
            runtime.spawn(async move { inner.run_batch(batch).await });
        } else if !state.dispatch_scheduled
            && runtime.runtime_flavor() == RuntimeFlavor::CurrentThread
        {
            state.dispatch_scheduled = true;
            drop(state);
            trace!(loader = %config.name, "scheduled dispatch");
            let inner = Arc::clone(inner);
            runtime.spawn(async move {
                // Let the rest of the current tick enqueue its keys first
                tokio::task::yield_now().await;
                inner.dispatch_pending().await;
            });
        }

        handle
    }

    /// Loads several keys, resolving to their results in input order.
    ///
    /// Every key is enqueued before this returns, exactly as if `load` had
    /// been called once per key. Duplicate keys share one handle when caching
    /// is enabled, and a failing key does not affect its siblings.
    pub fn load_many<I>(&self, keys: I) -> JoinAll<LoadHandle<V, F::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        let handles: Vec<_> = keys.into_iter().map(|key| self.load(key)).collect();
        join_all(handles)
    }

    /// Seeds the cache with an already-resolved value.
    ///
    /// Returns `false` without changing anything if caching is disabled or
    /// the key already has an entry (settled or in flight).
    pub fn prime(&self, key: K, value: V) -> bool {
        if !self.inner.config.cache_enabled {
            return false;
        }
        let mut state = self.inner.state.lock();
        if state.cache.contains_key(&key) {
            return false;
        }
        state.cache.insert(key, LoadHandle::settled(Ok(value)));
        true
    }

    /// Removes one key from the cache, returning whether it was present.
    ///
    /// A fetch already in flight for the key still settles the handles it
    /// handed out; only later loads re-fetch.
    pub fn clear(&self, key: &K) -> bool {
        if !self.inner.config.cache_enabled {
            return false;
        }
        self.inner.state.lock().cache.remove(key).is_some()
    }

    /// Removes every entry from the cache.
    pub fn clear_all(&self) {
        if !self.inner.config.cache_enabled {
            return;
        }
        self.inner.state.lock().cache.clear();
    }

    /// Flushes every pending key now and waits for those batches to settle.
    ///
    /// Required in [`DispatchMode::Manual`]; in auto mode it simply runs the
    /// tick's flush early.
    pub async fn dispatch(&self) {
        self.inner.dispatch_pending().await;
    }

    /// Returns true if the key has a cache entry (settled or in flight).
    pub fn is_cached(&self, key: &K) -> bool {
        self.inner.state.lock().cache.contains_key(key)
    }

    /// Returns the number of cache entries.
    pub fn cached_len(&self) -> usize {
        self.inner.state.lock().cache.len()
    }

    /// Returns the number of keys waiting for dispatch.
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }
}

impl<K, V, F> LoaderInner<K, V, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: BatchFn<K, V>,
{
    /// Takes the pending queue and runs it as one or more batches.
    async fn dispatch_pending(&self) {
        let pending = {
            let mut state = self.state.lock();
            state.dispatch_scheduled = false;
            state.take_pending()
        };
        self.run_batches(pending).await;
    }

    async fn run_batches(&self, pending: Vec<PendingLoad<K, V, F::Error>>) {
        if pending.is_empty() {
            return;
        }
        let batches = split_batches(pending, self.config.batch_limit());
        join_all(batches.into_iter().map(|batch| self.run_batch(batch))).await;
    }
}

impl<K, V, F> Flush for LoaderInner<K, V, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: BatchFn<K, V>,
{
    fn flush(self: Arc<Self>, generation: u64) {
        let Ok(runtime) = Handle::try_current() else {
            return;
        };
        let pending = {
            let mut state = self.state.lock();
            if state.generation != generation || state.pending.is_empty() {
                return;
            }
            state.take_pending()
        };
        trace!(loader = %self.config.name, keys = pending.len(), "handle awaited, dispatching");
        runtime.spawn(async move { self.run_batches(pending).await });
    }
}

/// Splits `pending` into consecutive batches of at most `limit` loads.
fn split_batches<T>(mut pending: Vec<T>, limit: usize) -> Vec<Vec<T>> {
    let limit = limit.max(1);
    let mut batches = Vec::new();
    while pending.len() > limit {
        let rest = pending.split_off(limit);
        batches.push(mem::replace(&mut pending, rest));
    }
    if !pending.is_empty() {
        batches.push(pending);
    }
    batches
}

impl<K, V, F> Clone for BatchLoader<K, V, F>
where
    F: BatchFn<K, V>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, F> fmt::Debug for BatchLoader<K, V, F>
where
    F: BatchFn<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BatchLoader")
            .field("config", &self.inner.config)
            .field("cached", &state.cache.len())
            .field("pending", &state.pending.len())
            .field("dispatch_scheduled", &state.dispatch_scheduled)
            .finish()
    }
}
