//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to ChatClient at construction
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → ChatClient::apply_config swaps the reloadable parts
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Dispatcher capacity and health interval are fixed per client; the
//!   rest (timeouts, retries, input limits, rate limits) can reload

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendConfig, ClientConfig, DispatcherConfig, HealthCheckConfig, InputConfig,
    ObservabilityConfig, RateLimitConfig, RendererConfig, RetryConfig, TimeoutConfig,
};
