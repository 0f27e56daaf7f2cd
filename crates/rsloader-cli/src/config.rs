//! Configuration management for the rsloader CLI.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use rsloader_cli::config::AppConfig;
//!
//! // Load from file with env overrides
//! let config = AppConfig::load("rsloader.yaml")?;
//!
//! // Or load from environment only
//! let config = AppConfig::from_env()?;
//! ```

use config::{Config, ConfigError, Environment, File, FileFormat};
use rsloader_core::LoaderConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resources served by a JSONPlaceholder-style API.
pub const RESOURCES: [&str; 4] = ["posts", "users", "todos", "comments"];

/// CLI configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    /// Upstream REST API settings
    #[serde(default)]
    pub api: ApiSettings,

    /// Loader settings
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Upstream REST API settings.
///
/// These settings can be overridden via environment variables with the
/// `RSLOADER_` prefix and `__` as the nested key separator:
///
/// - `RSLOADER_API__BASE_URL=http://localhost:3000`
/// - `RSLOADER_API__RESOURCE=users`
/// - `RSLOADER_API__TIMEOUT_SECS=5`
///
/// # Example YAML Configuration
///
/// ```yaml
/// api:
///   base_url: https://jsonplaceholder.typicode.com
///   resource: posts
///   timeout_secs: 10
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ApiSettings {
    /// Base URL; items are fetched from `{base_url}/{resource}/{id}`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Resource collection to load from.
    #[serde(default = "default_resource")]
    pub resource: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            resource: default_resource(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://jsonplaceholder.typicode.com".to_string()
}

fn default_resource() -> String {
    "posts".to_string()
}

fn default_timeout() -> u64 {
    10
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format instead of pretty text
    #[serde(default)]
    pub json: bool,

    /// Log a close event with timings for every span, e.g. each `batch_fetch`
    #[serde(default)]
    pub spans: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            spans: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl AppConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `RSLOADER_` and use `__` as
    /// separator. For example:
    /// - `RSLOADER_LOADER__MAX_BATCH_SIZE=10` overrides `loader.max_batch_size`
    /// - `RSLOADER_LOGGING__LEVEL=debug` overrides `logging.level`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            // RSLOADER_LOADER__NAME -> loader.name
            .add_source(env_source())
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(env_source())
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "api.base_url must start with http:// or https://, got: {}",
                    self.api.base_url
                ),
            });
        }

        if !RESOURCES.contains(&self.api.resource.as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "api.resource must be one of: {:?}, got: {}",
                    RESOURCES, self.api.resource
                ),
            });
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "api.timeout_secs must be greater than 0".to_string(),
            });
        }

        self.loader
            .validate()
            .map_err(|err| ConfigLoadError::Invalid {
                message: err.to_string(),
            })?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("RSLOADER")
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsloader_core::DispatchMode;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api:
  base_url: "http://127.0.0.1:3000"
  resource: users
  timeout_secs: 3

loader:
  name: users
  cache_enabled: false
  max_batch_size: 25
  dispatch: manual

logging:
  level: debug
  json: true
  spans: true
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.api.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.api.resource, "users");
        assert_eq!(config.api.timeout_secs, 3);
        assert_eq!(config.loader.name, "users");
        assert!(!config.loader.cache_enabled);
        assert!(config.loader.batch_enabled);
        assert_eq!(config.loader.max_batch_size, Some(25));
        assert_eq!(config.loader.dispatch, DispatchMode::Manual);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(config.logging.spans);
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api:
  resource: posts

loader:
  max_batch_size: 25
"#
        )
        .unwrap();

        std::env::set_var("RSLOADER_LOADER__MAX_BATCH_SIZE", "5");
        std::env::set_var("RSLOADER_LOGGING__LEVEL", "warn");

        let config = AppConfig::load(file.path());

        std::env::remove_var("RSLOADER_LOADER__MAX_BATCH_SIZE");
        std::env::remove_var("RSLOADER_LOGGING__LEVEL");

        let config = config.unwrap();
        assert_eq!(config.loader.max_batch_size, Some(5));
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.api.resource, "posts");
    }

    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("RSLOADER_API__RESOURCE", "todos");

        let config = AppConfig::from_env();

        std::env::remove_var("RSLOADER_API__RESOURCE");

        let config = config.unwrap();
        assert_eq!(config.api.resource, "todos");
        assert_eq!(config.api.base_url, default_base_url());
        assert_eq!(config.loader, LoaderConfig::default());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let result = AppConfig::load("/nonexistent/rsloader.yaml");

        assert!(matches!(
            result,
            Err(ConfigLoadError::FileNotFound { path }) if path == "/nonexistent/rsloader.yaml"
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = AppConfig::default();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.api.resource = "albums".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api.resource"));

        let mut config = AppConfig::default();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.loader.max_batch_size = Some(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_batch_size"));

        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_invalid_config_returns_clear_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
loader:
  name: ""
"#
        )
        .unwrap();

        let result = AppConfig::load(file.path());

        assert!(matches!(result, Err(ConfigLoadError::Invalid { .. })));
    }
}
