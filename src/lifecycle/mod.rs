//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → CLI overrides → Validate → Logging / metrics
//!
//! Shutdown (shutdown.rs):
//!     Signal or /quit → Shutdown::trigger → background tasks exit
//!     → ChatClient::dispose (health interval, cooldown timer, queue)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
