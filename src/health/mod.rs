//! Backend health monitoring.
//!
//! # Data Flow
//! ```text
//! Interval tick (active.rs)
//!     → Connecting
//!     → Dispatcher (health-check kind) → RetryPolicy → with_deadline → GET /health
//!     → Connected | Disconnected (state.rs)
//!     → watch channel → UI / ChatClient::connection_state
//! ```
//!
//! # Design Decisions
//! - Probes share the dispatcher's admission control with chat turns
//! - Connection state is advisory; it never blocks a chat turn
//! - Probe failures are logged, never surfaced or rate-limited

pub mod active;
pub mod state;

pub use active::{HealthMonitor, HealthSettings};
pub use state::{ConnectionState, ConnectionStateCell, ConnectionStatus};
