//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (deadline per attempt)
//!     → On failure: retries.rs (retry with backoff.rs delays)
//!     → On terminal failure: classify.rs (taxonomy key)
//!     → circuit_breaker.rs (track error rate, decide whether the user sees it)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend attempt has a deadline
//! - Jittered backoff prevents synchronized retry storms across clients
//! - The breaker gates error *reporting*, never the requests themselves

pub mod backoff;
pub mod circuit_breaker;
pub mod classify;
pub mod retries;
pub mod timeouts;

pub use backoff::BackoffPolicy;
pub use circuit_breaker::{ErrorRateLimiter, ErrorRecord, RateLimitSnapshot, RateLimits};
pub use classify::classify;
pub use retries::RetryPolicy;
