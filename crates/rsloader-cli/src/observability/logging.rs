//! Structured logging setup driven by the `logging` config section.
//!
//! `RUST_LOG` takes precedence over `logging.level`, so loader internals can
//! be inspected with e.g. `RUST_LOG=rsloader_core=trace`. Logs go to stderr,
//! leaving stdout to the walkthrough output.

use std::io;

use tracing::Subscriber;
use tracing_subscriber::fmt::{self, format::FmtSpan, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{prelude::*, EnvFilter, Layer};

use crate::config::LoggingSettings;

/// Installs the global subscriber described by `settings`.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.to_lowercase()));

    tracing_subscriber::registry()
        .with(filter)
        .with(settings.json.then(|| json_layer(settings, io::stderr)))
        .with((!settings.json).then(|| text_layer(settings)))
        .try_init()
}

/// JSON lines, each carrying the span it was emitted in.
pub fn json_layer<S, W>(
    settings: &LoggingSettings,
    writer: W,
) -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_events(span_events(settings))
        .with_writer(writer)
}

fn text_layer<S>(settings: &LoggingSettings) -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fmt::layer()
        .pretty()
        .with_span_events(span_events(settings))
        .with_writer(io::stderr)
}

fn span_events(settings: &LoggingSettings) -> FmtSpan {
    if settings.spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}
