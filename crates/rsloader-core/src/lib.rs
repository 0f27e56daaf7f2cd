//! rsloader-core: Batching and caching request coalescer
//!
//! This crate contains the loader engine including:
//! - Per-tick coalescing of key loads into batched fetches
//! - Deduplication of identical in-flight keys
//! - A per-loader value cache with priming and invalidation
//! - Per-key error isolation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                rsloader-core                 │
//! ├─────────────────────────────────────────────┤
//! │  loader/   - BatchLoader engine & dispatch  │
//! │  fetch.rs  - Batch fetch function contract  │
//! │  handle.rs - Shared load handles            │
//! │  config.rs - Loader configuration           │
//! │  error.rs  - Load and config errors         │
//! │  metrics.rs- Metric descriptions            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use rsloader_core::{batch_fn, BatchLoader};
//!
//! let loader = BatchLoader::new(batch_fn(|ids: Vec<u64>| async move {
//!     Ok::<_, std::io::Error>(ids.into_iter().map(|id| Ok(id * 2)).collect())
//! }));
//!
//! // Both loads land in the same batch.
//! let (a, b) = tokio::join!(loader.load(1), loader.load(2));
//! assert_eq!(a.unwrap(), 2);
//! assert_eq!(b.unwrap(), 4);
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod handle;
pub mod loader;
pub mod metrics;

// Re-export commonly used types at the crate root
pub use crate::config::{DispatchMode, LoaderConfig};
pub use crate::error::{ConfigError, LoadError, LoadResult};
pub use crate::fetch::{batch_fn, BatchFn, FnBatch};
pub use crate::handle::LoadHandle;
pub use crate::loader::BatchLoader;
pub use crate::metrics::register_loader_metrics;
