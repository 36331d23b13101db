//! Backend connection state.
//!
//! # States
//! - Connecting: a probe cycle is in progress
//! - Connected: the last probe succeeded
//! - Disconnected: the last probe exhausted its retries
//!
//! # State Transitions
//! ```text
//! (every interval tick) → Connecting
//! Connecting → Connected: probe succeeds
//! Connecting → Disconnected: probe exhausts retries
//! ```
//!
//! # Design Decisions
//! - Only the health monitor writes; everyone else gets a read-only handle
//! - Backed by a watch channel so the UI can await changes
//! - State changes logged for observability

use std::fmt;

use serde::Serialize;
use tokio::sync::watch;

use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writer side, held by the health monitor.
#[derive(Debug)]
pub struct ConnectionStateCell {
    tx: watch::Sender<ConnectionState>,
}

impl ConnectionStateCell {
    /// Create the cell (initially `Connecting`) and its read handle.
    pub fn new() -> (Self, ConnectionStatus) {
        let (tx, rx) = watch::channel(ConnectionState::Connecting);
        (Self { tx }, ConnectionStatus { rx })
    }

    pub fn set(&self, next: ConnectionState) {
        let previous = self.tx.send_replace(next);
        metrics::record_connection_state(next);
        if previous != next && next != ConnectionState::Connecting {
            match next {
                ConnectionState::Disconnected => {
                    tracing::warn!(from = %previous, to = %next, "Backend connection state changed")
                }
                _ => {
                    tracing::info!(from = %previous, to = %next, "Backend connection state changed")
                }
            }
        }
    }

    pub fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }
}

/// Read-only view of the connection state.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    rx: watch::Receiver<ConnectionState>,
}

impl ConnectionStatus {
    pub fn get(&self) -> ConnectionState {
        *self.rx.borrow()
    }

    /// A receiver that is notified on every state write.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.rx.clone()
    }

    /// Wait until the state equals `target`.
    ///
    /// Returns `false` if the monitor went away first.
    pub async fn wait_for(&self, target: ConnectionState) -> bool {
        let mut rx = self.rx.clone();
        let reached = rx.wait_for(|state| *state == target).await.is_ok();
        reached
    }
}
