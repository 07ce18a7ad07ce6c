//! Tracing subscriber setup.

use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LevelFilter,
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Unknown level names fall back to `info`.
    pub fn new(level: &str, json_format: bool) -> Self {
        Self {
            level: level.parse().unwrap_or(LevelFilter::INFO),
            json_format,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` directives take precedence over
/// the configured level. Calling this twice is harmless.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let fmt_layer = if config.json_format {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init();
}
