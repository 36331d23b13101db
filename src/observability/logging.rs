//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level when set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Build the filter for this process.
pub fn filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("chatline={},mock_backend={}", config.log_level, config.log_level))
    })
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(config: &ObservabilityConfig) {
    // Logs go to stderr so they don't interleave with the chat transcript.
    let result = tracing_subscriber::registry()
        .with(filter(config))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if result.is_ok() {
        tracing::debug!(log_level = %config.log_level, "Logging initialized");
    }
}
