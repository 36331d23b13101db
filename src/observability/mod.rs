//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (tracing subscriber, stderr)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Terminal / log capture
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Suppressed errors are still logged and counted, just never shown
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
