//! rsloader-cli: Demo walkthrough for rsloader over a REST API
//!
//! This crate contains:
//! - Layered configuration (defaults, YAML file, `RSLOADER_` env vars)
//! - Structured logging setup
//! - An HTTP batch fetch function for JSONPlaceholder-style APIs
//! - The scripted loader walkthrough run by the `rsloader` binary

pub mod config;
pub mod demo;
pub mod fetch;
pub mod observability;

pub use config::{AppConfig, ConfigLoadError};
pub use fetch::{HttpBatchFn, HttpFetchError};
