//! Error types for load and configuration operations.

use std::sync::Arc;

use thiserror::Error;

/// Errors a load handle can settle with.
///
/// Fetch errors are wrapped in an `Arc` so one failure can be fanned out to
/// every handle of a batch without requiring `E: Clone`.
#[derive(Debug, Error)]
pub enum LoadError<E> {
    /// The fetch function reported a failure for this key only.
    #[error("fetch failed for key: {0}")]
    Key(Arc<E>),

    /// The fetch function failed as a whole; every key in the batch gets it.
    #[error("batch fetch failed: {0}")]
    Batch(Arc<E>),

    /// The fetch function returned the wrong number of results.
    #[error("batch fetch returned {actual} results for {expected} keys")]
    ContractViolation { expected: usize, actual: usize },

    /// The batch was dropped before it settled.
    #[error("batch was dropped before settling")]
    Abandoned,
}

impl<E> LoadError<E> {
    /// Returns the underlying fetch error, if any.
    pub fn fetch_error(&self) -> Option<&E> {
        match self {
            LoadError::Key(err) | LoadError::Batch(err) => Some(&**err),
            LoadError::ContractViolation { .. } | LoadError::Abandoned => None,
        }
    }

    /// Returns true if only this key failed.
    pub fn is_key_error(&self) -> bool {
        matches!(self, LoadError::Key(_))
    }
}

impl<E> Clone for LoadError<E> {
    fn clone(&self) -> Self {
        match self {
            LoadError::Key(err) => LoadError::Key(Arc::clone(err)),
            LoadError::Batch(err) => LoadError::Batch(Arc::clone(err)),
            LoadError::ContractViolation { expected, actual } => LoadError::ContractViolation {
                expected: *expected,
                actual: *actual,
            },
            LoadError::Abandoned => LoadError::Abandoned,
        }
    }
}

/// Result a load handle settles with.
pub type LoadResult<V, E> = Result<V, LoadError<E>>;

/// Errors from validating a loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid loader configuration: {message}")]
    Invalid { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct NotFound(u32);

    impl std::fmt::Display for NotFound {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "not found: {}", self.0)
        }
    }

    #[test]
    fn test_error_messages_name_the_failure() {
        let key: LoadError<NotFound> = LoadError::Key(Arc::new(NotFound(7)));
        let batch: LoadError<NotFound> = LoadError::Batch(Arc::new(NotFound(7)));
        let violation: LoadError<NotFound> = LoadError::ContractViolation {
            expected: 3,
            actual: 2,
        };

        assert_eq!(key.to_string(), "fetch failed for key: not found: 7");
        assert_eq!(batch.to_string(), "batch fetch failed: not found: 7");
        assert_eq!(
            violation.to_string(),
            "batch fetch returned 2 results for 3 keys"
        );
    }

    #[test]
    fn test_clone_shares_fetch_error() {
        let err: LoadError<NotFound> = LoadError::Batch(Arc::new(NotFound(1)));
        let cloned = err.clone();

        match (&err, &cloned) {
            (LoadError::Batch(a), LoadError::Batch(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("Expected Batch errors"),
        }
        assert_eq!(cloned.fetch_error(), Some(&NotFound(1)));
        assert!(!cloned.is_key_error());
    }

    #[test]
    fn test_contract_violation_has_no_fetch_error() {
        let err: LoadError<NotFound> = LoadError::ContractViolation {
            expected: 1,
            actual: 0,
        };
        assert!(err.fetch_error().is_none());
    }
}
