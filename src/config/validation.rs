//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, delays ordered, URL parseable)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., "dispatcher.max_concurrent").
    pub field: &'static str,
    /// What is wrong with it.
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.backend.base_url) {
        Ok(url) if url.cannot_be_a_base() => {
            errors.push(ValidationError::new("backend.base_url", "URL cannot be a base"));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("backend.base_url", e.to_string())),
    }
    for (field, path) in [
        ("backend.health_path", &config.backend.health_path),
        ("backend.chat_path", &config.backend.chat_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        }
    }

    if config.dispatcher.max_concurrent == 0 {
        errors.push(ValidationError::new("dispatcher.max_concurrent", "must be greater than 0"));
    }

    let retries = &config.retries;
    if retries.base_delay_ms == 0 {
        errors.push(ValidationError::new("retries.base_delay_ms", "must be greater than 0"));
    }
    if !(retries.multiplier >= 1.0 && retries.multiplier.is_finite()) {
        errors.push(ValidationError::new("retries.multiplier", "must be a finite value >= 1.0"));
    }
    if retries.max_delay_ms < retries.base_delay_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            format!("must be >= base_delay_ms ({})", retries.base_delay_ms),
        ));
    }

    if config.timeouts.chat_secs == 0 {
        errors.push(ValidationError::new("timeouts.chat_secs", "must be greater than 0"));
    }
    if config.timeouts.health_secs == 0 {
        errors.push(ValidationError::new("timeouts.health_secs", "must be greater than 0"));
    }
    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::new("health_check.interval_secs", "must be greater than 0"));
    }

    let rate = &config.rate_limit;
    if rate.max_consecutive == 0 {
        errors.push(ValidationError::new("rate_limit.max_consecutive", "must be greater than 0"));
    }
    if rate.per_minute == 0 {
        errors.push(ValidationError::new("rate_limit.per_minute", "must be greater than 0"));
    }
    if rate.per_hour < rate.per_minute {
        errors.push(ValidationError::new(
            "rate_limit.per_hour",
            format!("must be >= per_minute ({})", rate.per_minute),
        ));
    }
    if rate.retention_secs < 60 {
        errors.push(ValidationError::new(
            "rate_limit.retention_secs",
            "must cover at least 60 seconds",
        ));
    }

    if config.input.max_message_chars == 0 {
        errors.push(ValidationError::new("input.max_message_chars", "must be greater than 0"));
    }

    if !(config.renderer.item_height > 0.0 && config.renderer.item_height.is_finite()) {
        errors.push(ValidationError::new("renderer.item_height", "must be a positive number"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address when metrics are enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
