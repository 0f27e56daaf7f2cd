//! Scripted walkthrough of loader behavior.
//!
//! Each step records what was loaded and whether it took a new fetch,
//! so the same script works against the live API and an in-memory fetcher.

use std::fmt;

use rsloader_core::{BatchFn, BatchLoader, LoadResult};
use serde_json::{json, Value};
use tracing::info;

/// Key seeded with `prime` instead of being fetched.
pub const PRIMED_KEY: u64 = 999;

/// Outcome of one walkthrough step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// What the step did.
    pub title: &'static str,
    /// One entry per key, in request order. Errors are rendered as text.
    pub results: Vec<Result<Value, String>>,
}

impl Step {
    fn new<E: fmt::Display>(title: &'static str, results: Vec<LoadResult<Value, E>>) -> Self {
        Self {
            title,
            results: results
                .into_iter()
                .map(|result| result.map_err(|err| err.to_string()))
                .collect(),
        }
    }
}

/// Value stored for [`PRIMED_KEY`].
pub fn primed_value() -> Value {
    json!({ "id": PRIMED_KEY, "title": "Primed value, never fetched" })
}

/// Runs the walkthrough against `loader`:
///
/// 1. load `1` (fetched)
/// 2. load `1` again (cached)
/// 3. `load_many([1, 2, 3])` (only `2` and `3` fetched)
/// 4. prime [`PRIMED_KEY`] and load it (cached)
/// 5. `clear_all`, then load `1` (fetched again)
pub async fn run_walkthrough<F>(loader: &BatchLoader<u64, Value, F>) -> Vec<Step>
where
    F: BatchFn<u64, Value>,
    F::Error: fmt::Display,
{
    let mut steps = Vec::with_capacity(5);

    let first = loader.load(1).await;
    steps.push(Step::new("load 1", vec![first]));

    let again = loader.load(1).await;
    steps.push(Step::new("load 1 again", vec![again]));

    let many = loader.load_many([1, 2, 3]).await;
    steps.push(Step::new("load_many [1, 2, 3]", many));

    let primed = loader.prime(PRIMED_KEY, primed_value());
    info!(key = PRIMED_KEY, primed, "primed cache");
    let from_prime = loader.load(PRIMED_KEY).await;
    steps.push(Step::new("load primed 999", vec![from_prime]));

    loader.clear_all();
    info!("cleared cache");
    let refetched = loader.load(1).await;
    steps.push(Step::new("load 1 after clear_all", vec![refetched]));

    steps
}
