//! Logging setup and span helpers.
//!
//! Events go to stderr so stdout stays reserved for the JSON results the CLI
//! prints.

use std::io::IsTerminal;
use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "scanpass=info";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Human-readable single-line logs.
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Safe to call multiple times; subsequent calls are no-ops.
/// `RUST_LOG` overrides the default `scanpass=info` filter.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let ansi = std::io::stderr().is_terminal();
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_ansi(ansi).with_writer(std::io::stderr))
                    .init();
            }
        }
    });
}

/// Creates a span for one engine operation on one identifier.
#[must_use]
pub fn operation_span(operation: &'static str, identifier: &str) -> Span {
    tracing::info_span!("scanpass", op = operation, identifier = identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Json);
    }

    #[test]
    fn test_operation_span() {
        let span = operation_span("redeem", "A1");
        let _guard = span.enter();
        tracing::info!("message in span");
    }
}
