//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration from file (or defaults) and apply CLI overrides
//! - Validate before anything starts
//! - Initialize logging and the optional metrics exporter
//!
//! Fail fast: any error here is fatal to the process.

use std::path::Path;

use crate::config::{load_config, validation::validate_config, ClientConfig, ConfigError};
use crate::observability::{logging, metrics};

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_url: Option<String>,
    pub log_level: Option<String>,
}

/// Read the config at `path` (defaults when absent) and apply `overrides`.
pub fn load_startup_config(
    path: Option<&Path>,
    overrides: &Overrides,
) -> Result<ClientConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    if let Some(url) = &overrides.backend_url {
        config.backend.base_url = url.clone();
    }
    if let Some(level) = &overrides.log_level {
        config.observability.log_level = level.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Install logging and, when enabled, the Prometheus exporter.
///
/// Must run inside a Tokio runtime when metrics are enabled.
pub fn init_observability(config: &ClientConfig) {
    logging::init(&config.observability);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }
}
