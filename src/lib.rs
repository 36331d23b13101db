//! Resilient chat client for a remote inference backend.

pub mod chat;
pub mod client;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod transport;

pub use client::{ChatClient, Diagnostics};
pub use config::ClientConfig;
pub use error::{FailureKind, TurnError};
pub use lifecycle::Shutdown;
