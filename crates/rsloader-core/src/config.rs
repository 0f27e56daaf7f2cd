//! Configuration for batch loaders.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a loader decides when to flush its pending keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Spawn a flush on the current tokio runtime at the end of the tick.
    #[default]
    Auto,
    /// Keys stay pending until the host calls `BatchLoader::dispatch`.
    Manual,
}

/// Configuration for a batch loader.
///
/// # Example YAML Configuration
///
/// ```yaml
/// loader:
///   name: posts
///   cache_enabled: true
///   batch_enabled: true
///   max_batch_size: 25
///   dispatch: auto
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Name used to label metrics and tracing spans.
    #[serde(default = "default_name")]
    pub name: String,

    /// Whether resolved values are cached and in-flight keys deduplicated.
    ///
    /// When disabled, every `load` enqueues its key and `prime`/`clear` do nothing.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Whether keys are coalesced into batches at all.
    ///
    /// When disabled, each key is fetched in a batch of its own.
    #[serde(default = "default_true")]
    pub batch_enabled: bool,

    /// Flush a batch early once it holds this many keys. `None` is unbounded.
    #[serde(default)]
    pub max_batch_size: Option<usize>,

    /// How pending keys get flushed.
    #[serde(default)]
    pub dispatch: DispatchMode,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            cache_enabled: true,
            batch_enabled: true,
            max_batch_size: None,
            dispatch: DispatchMode::Auto,
        }
    }
}

fn default_name() -> String {
    "loader".to_string()
}

fn default_true() -> bool {
    true
}

impl LoaderConfig {
    /// Sets the loader name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables or disables caching.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Enables or disables batching.
    pub fn with_batch_enabled(mut self, enabled: bool) -> Self {
        self.batch_enabled = enabled;
        self
    }

    /// Sets the maximum batch size.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size);
        self
    }

    /// Sets the dispatch mode.
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Largest number of keys a single fetch call may receive.
    pub fn batch_limit(&self) -> usize {
        if !self.batch_enabled {
            return 1;
        }
        self.max_batch_size.unwrap_or(usize::MAX)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "name cannot be empty".to_string(),
            });
        }

        if self.max_batch_size == Some(0) {
            return Err(ConfigError::Invalid {
                message: "max_batch_size must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LoaderConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.name, "loader");
        assert!(config.cache_enabled);
        assert!(config.batch_enabled);
        assert_eq!(config.max_batch_size, None);
        assert_eq!(config.dispatch, DispatchMode::Auto);
        assert_eq!(config.batch_limit(), usize::MAX);
    }

    #[test]
    fn test_config_validation_catches_errors() {
        let config = LoaderConfig::default().with_max_batch_size(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_batch_size"));

        let config = LoaderConfig::default().with_name("  ");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_batch_limit_follows_batching_flags() {
        let config = LoaderConfig::default().with_max_batch_size(10);
        assert_eq!(config.batch_limit(), 10);

        // Disabling batching wins over any configured size
        let config = config.with_batch_enabled(false);
        assert_eq!(config.batch_limit(), 1);
    }

    #[test]
    fn test_dispatch_mode_uses_snake_case_names() {
        let manual: DispatchMode = deserialize_variant("manual");
        assert_eq!(manual, DispatchMode::Manual);
        let auto: DispatchMode = deserialize_variant("auto");
        assert_eq!(auto, DispatchMode::Auto);
    }

    /// Deserializes a unit variant from its bare name.
    fn deserialize_variant(name: &str) -> DispatchMode {
        use serde::de::value::{Error, StrDeserializer};
        use serde::de::IntoDeserializer;

        let deserializer: StrDeserializer<'_, Error> = name.into_deserializer();
        DispatchMode::deserialize(deserializer).unwrap()
    }
}
