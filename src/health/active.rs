//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe the backend through the dispatcher
//! - Update the connection state based on results
//! - Stay silent: probe failures never reach the user or the error limiter

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::ClientConfig;
use crate::dispatch::{Dispatcher, RequestDescriptor};
use crate::error::DispatchError;
use crate::health::state::{ConnectionState, ConnectionStateCell, ConnectionStatus};
use crate::resilience::retries::RetryPolicy;
use crate::resilience::timeouts::with_deadline;
use crate::transport::ChatBackend;

/// Health monitor settings.
#[derive(Debug, Clone, Copy)]
pub struct HealthSettings {
    pub enabled: bool,
    pub interval: Duration,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl HealthSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            enabled: config.health_check.enabled,
            interval: Duration::from_secs(config.health_check.interval_secs),
            timeout: config.timeouts.health(),
            retry: RetryPolicy::from_config(&config.retries)
                .with_max_retries(config.health_check.max_retries),
        }
    }
}

pub struct HealthMonitor<B> {
    backend: Arc<B>,
    dispatcher: Dispatcher,
    settings: HealthSettings,
    state: ConnectionStateCell,
}

impl<B: ChatBackend> HealthMonitor<B> {
    /// Create a monitor and the read-only status handle it drives.
    pub fn new(
        backend: Arc<B>,
        dispatcher: Dispatcher,
        settings: HealthSettings,
    ) -> (Self, ConnectionStatus) {
        let (state, status) = ConnectionStateCell::new();
        (
            Self {
                backend,
                dispatcher,
                settings,
                state,
            },
            status,
        )
    }

    /// Run one probe cycle and return the resulting state.
    pub async fn probe_once(&self) -> ConnectionState {
        let previous = self.state.get();
        self.state.set(ConnectionState::Connecting);

        let backend = self.backend.clone();
        let retry = self.settings.retry;
        let timeout = self.settings.timeout;
        let outcome = self
            .dispatcher
            .execute(RequestDescriptor::health_check(move || async move {
                retry
                    .run(|_| with_deadline(timeout, backend.check_health()))
                    .await
            }))
            .await;

        let next = match outcome {
            Ok(Ok(())) => ConnectionState::Connected,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Health probe failed");
                ConnectionState::Disconnected
            }
            Err(DispatchError::QueueFull { .. }) => {
                // Not a backend verdict; keep what we knew.
                tracing::debug!("Dispatcher saturated, skipping health probe");
                previous
            }
            Err(DispatchError::Closed) => previous,
        };
        self.state.set(next);
        next
    }

    /// Probe on every interval tick until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.settings.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.settings.interval.as_secs(),
            timeout_ms = self.settings.timeout.as_millis() as u64,
            attempts = self.settings.retry.max_attempts(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // An in-flight check is abandoned as soon as shutdown fires.
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => break,
            }
            tokio::select! {
                _ = self.probe_once() => {}
                _ = shutdown.recv() => break,
            }
        }
        tracing::info!("Health monitor received shutdown signal, exiting loop");
    }

    /// Spawn [`run`](Self::run) onto the current runtime.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
