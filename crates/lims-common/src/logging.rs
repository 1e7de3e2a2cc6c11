//! Structured Logging Configuration
//!
//! - JSON output for production (`LOG_FORMAT=json`)
//! - Human-readable output otherwise
//! - `RUST_LOG` filter, defaulting to `info`
//!
//! ```rust,ignore
//! lims_common::logging::init_logging("lims-cli");
//! tracing::info!(endpoint = %endpoint, "Issuing request");
//! ```

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Output format of the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// "json" (any case) selects JSON, everything else is text
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_FORMAT").unwrap_or_default())
    }
}

/// Initialize logging, reading `LOG_FORMAT` and `RUST_LOG`.
pub fn init_logging(service_name: &str) {
    init_logging_with(service_name, LogFormat::from_env(), "info");
}

/// Initialize logging with an explicit format and a fallback filter used
/// when `RUST_LOG` is unset.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging_with(service_name: &str, format: LogFormat, default_filter: &str) {
    let env_filter = build_filter(default_filter);

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true)
                    .flatten_event(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(service = service_name, ?format, "Logging initialized");
    }
}

fn build_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
    }

    #[test]
    fn test_invalid_default_filter_falls_back() {
        let filter = build_filter("lims_bridge=[");
        drop(filter);
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_logging_with("test", LogFormat::Text, "warn");
        init_logging_with("test", LogFormat::Json, "warn");
    }
}
