//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the chat client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Inference backend location.
    pub backend: BackendConfig,

    /// Admission control for outbound requests.
    pub dispatcher: DispatcherConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Error rate limiting (circuit breaker) settings.
    pub rate_limit: RateLimitConfig,

    /// Input ceilings checked before any network call.
    pub input: InputConfig,

    /// Conversation list virtualization.
    pub renderer: RendererConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the inference backend (e.g., "http://127.0.0.1:8001").
    pub base_url: String,

    /// Path of the liveness endpoint.
    pub health_path: String,

    /// Path of the chat endpoint.
    pub chat_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8001".to_string(),
            health_path: "/health".to_string(),
            chat_path: "/chat".to_string(),
        }
    }
}

/// Dispatcher (connection pool) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Maximum requests in flight at once.
    pub max_concurrent: usize,

    /// Maximum requests waiting for a slot. Submissions beyond this fail fast.
    pub max_queue_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_queue_size: 5,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (total attempts = max_retries + 1).
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Growth factor applied per attempt.
    pub multiplier: f64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
            multiplier: 2.0,
            max_delay_ms: 10_000,
        }
    }
}

/// Timeout configuration for backend calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-attempt deadline for chat turns in seconds.
    pub chat_secs: u64,

    /// Per-attempt deadline for health probes in seconds.
    pub health_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            chat_secs: 15,
            health_secs: 5,
        }
    }
}

impl TimeoutConfig {
    pub fn chat(&self) -> Duration {
        Duration::from_secs(self.chat_secs)
    }

    pub fn health(&self) -> Duration {
        Duration::from_secs(self.health_secs)
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the periodic health monitor.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Retries per probe cycle (attempts = max_retries + 1).
    pub max_retries: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            max_retries: 1,
        }
    }
}

/// Error rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum errors surfaced within any 60 second window.
    pub per_minute: usize,

    /// Maximum errors retained within the retention window.
    pub per_hour: usize,

    /// Consecutive errors that trigger a cooldown.
    pub max_consecutive: u32,

    /// Cooldown duration in milliseconds.
    pub cooldown_ms: u64,

    /// Errors closer together than this count as consecutive.
    pub consecutive_window_ms: u64,

    /// How long error records are retained, in seconds.
    pub retention_secs: u64,

    /// How many records `recent_errors` returns at most.
    pub recent_capacity: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: 5,
            per_hour: 20,
            max_consecutive: 3,
            cooldown_ms: 30_000,
            consecutive_window_ms: 5_000,
            retention_secs: 3_600,
            recent_capacity: 50,
        }
    }
}

/// Input ceilings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    /// Maximum message length in characters.
    pub max_message_chars: usize,

    /// Maximum voice payload size in bytes.
    pub max_audio_bytes: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 2_000,
            max_audio_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Virtualized conversation list configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Conversation length above which windowing kicks in.
    pub threshold: usize,

    /// Extra items materialized above and below the visible range.
    pub overscan: usize,

    /// Estimated height of one message, in pixels.
    pub item_height: f64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            threshold: 50,
            overscan: 5,
            item_height: 80.0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ClientConfig::default();
        assert_eq!(config.dispatcher.max_concurrent, 3);
        assert_eq!(config.dispatcher.max_queue_size, 5);
        assert_eq!(config.retries.max_retries, 2);
        assert_eq!(config.timeouts.chat(), Duration::from_secs(15));
        assert_eq!(config.timeouts.health(), Duration::from_secs(5));
        assert_eq!(config.health_check.interval_secs, 10);
        assert_eq!(config.rate_limit.per_minute, 5);
        assert_eq!(config.rate_limit.per_hour, 20);
        assert_eq!(config.rate_limit.max_consecutive, 3);
        assert_eq!(config.rate_limit.cooldown_ms, 30_000);
        assert_eq!(config.renderer.threshold, 50);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [backend]
            base_url = "http://10.0.0.2:9000"

            [dispatcher]
            max_concurrent = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.base_url, "http://10.0.0.2:9000");
        assert_eq!(config.backend.chat_path, "/chat");
        assert_eq!(config.dispatcher.max_concurrent, 8);
        assert_eq!(config.dispatcher.max_queue_size, 5);
    }
}
