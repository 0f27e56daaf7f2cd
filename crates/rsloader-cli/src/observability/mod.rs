//! Observability setup for the rsloader CLI.
//!
//! Only logging is configured here. Loader metrics are described at startup
//! but no recorder is installed, so they are dropped.

mod logging;

pub use logging::{init_logging, json_layer};
