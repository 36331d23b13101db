//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chat_dispatch_active` (gauge): requests currently holding a slot
//! - `chat_dispatch_queued` (gauge): requests waiting for a slot
//! - `chat_dispatch_rejected_total` (counter): queue-full rejections by request kind
//! - `chat_retry_attempts_total` (counter): retries scheduled by failure kind
//! - `chat_errors_total` (counter): recorded errors by kind and whether they were shown
//! - `chat_cooldowns_total` (counter): error cooldowns entered
//! - `chat_connection_state` (gauge): 0 connecting, 1 connected, 2 disconnected
//! - `chat_turn_duration_seconds` (histogram): end-to-end turn latency by outcome
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::time::Instant;

use crate::error::FailureKind;
use crate::health::ConnectionState;

/// Install the Prometheus recorder with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn set_dispatch_depth(active: usize, queued: usize) {
    gauge!("chat_dispatch_active").set(active as f64);
    gauge!("chat_dispatch_queued").set(queued as f64);
}

pub fn record_dispatch_rejected(kind: &'static str) {
    counter!("chat_dispatch_rejected_total", "kind" => kind).increment(1);
}

pub fn record_retry(kind: FailureKind) {
    counter!("chat_retry_attempts_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_error(kind: FailureKind, surfaced: bool) {
    let surfaced = if surfaced { "true" } else { "false" };
    counter!("chat_errors_total", "kind" => kind.as_str(), "surfaced" => surfaced).increment(1);
}

pub fn record_cooldown_started() {
    counter!("chat_cooldowns_total").increment(1);
}

pub fn record_connection_state(state: ConnectionState) {
    let value = match state {
        ConnectionState::Connecting => 0.0,
        ConnectionState::Connected => 1.0,
        ConnectionState::Disconnected => 2.0,
    };
    gauge!("chat_connection_state").set(value);
}

/// `outcome` is "ok", "surfaced", "suppressed" or "rejected".
pub fn record_turn(outcome: &'static str, start: Instant) {
    histogram!("chat_turn_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}
