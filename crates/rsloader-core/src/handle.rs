//! Shared handles returned by `BatchLoader::load`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::future::{FutureExt, Shared};
use tokio::sync::oneshot;

use crate::error::{LoadError, LoadResult};

/// Settles once, either immediately or when the batch sends its result.
enum Settlement<V, E> {
    Ready(Option<LoadResult<V, E>>),
    Waiting(oneshot::Receiver<LoadResult<V, E>>),
}

// Neither variant is structurally pinned.
impl<V, E> Unpin for Settlement<V, E> {}

impl<V, E> Future for Settlement<V, E> {
    type Output = LoadResult<V, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut() {
            Settlement::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(LoadError::Abandoned)))
            }
            // A dropped sender means the batch never settled this key
            Settlement::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(LoadError::Abandoned))),
        }
    }
}

/// Loader side of the end-of-segment hook.
pub(crate) trait Flush: Send + Sync {
    /// Dispatches the pending queue if it is still `generation`.
    fn flush(self: Arc<Self>, generation: u64);
}

/// Flushes the queue a load was enqueued in when a handle is first polled.
#[derive(Clone)]
struct FlushOnPoll {
    loader: Weak<dyn Flush>,
    generation: u64,
}

/// A load request's eventual result, shared by every caller of the same key.
///
/// Awaiting a handle yields the value or the [`LoadError`] its batch settled
/// with. Clones observe the same settlement.
///
/// The first poll of a handle whose key is still queued dispatches that
/// queue: a task awaiting its handle has finished enqueueing.
pub struct LoadHandle<V, E> {
    inner: Shared<Settlement<V, E>>,
    flush: Option<FlushOnPoll>,
}

/// Sending half of a pending handle, owned by the batch that will settle it.
pub(crate) type Settler<V, E> = oneshot::Sender<LoadResult<V, E>>;

impl<V, E> LoadHandle<V, E>
where
    V: Clone,
{
    /// Creates a pending handle and the sender that settles it.
    pub(crate) fn pending() -> (Settler<V, E>, Self) {
        let (tx, rx) = oneshot::channel();
        let handle = Self {
            inner: Settlement::Waiting(rx).shared(),
            flush: None,
        };
        (tx, handle)
    }

    /// Makes the first poll flush `loader` while its queue is `generation`.
    pub(crate) fn flush_on_poll(mut self, loader: Weak<dyn Flush>, generation: u64) -> Self {
        self.flush = Some(FlushOnPoll { loader, generation });
        self
    }

    /// Creates a handle that is already settled with `result`.
    pub fn settled(result: LoadResult<V, E>) -> Self {
        Self {
            inner: Settlement::Ready(Some(result)).shared(),
            flush: None,
        }
    }

    /// Returns the result if the handle has already been polled to completion.
    pub fn peek(&self) -> Option<&LoadResult<V, E>> {
        self.inner.peek()
    }

    /// Returns true if both handles share the same underlying request.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Shared::ptr_eq(&self.inner, &other.inner)
    }
}

impl<V, E> Clone for LoadHandle<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            flush: self.flush.clone(),
        }
    }
}

impl<V, E> fmt::Debug for LoadHandle<V, E>
where
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadHandle")
            .field("strong_count", &self.inner.strong_count())
            .finish()
    }
}

impl<V, E> Future for LoadHandle<V, E>
where
    V: Clone,
{
    type Output = LoadResult<V, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(hook) = this.flush.take() {
            if let Some(loader) = hook.loader.upgrade() {
                loader.flush(hook.generation);
            }
        }
        Pin::new(&mut this.inner).poll(cx)
    }
}
