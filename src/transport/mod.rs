//! Backend transport.
//!
//! # Data Flow
//! ```text
//! ChatOrchestrator / HealthMonitor
//!     → ChatBackend trait (client.rs)
//!     → HttpBackend: reqwest GET /health, POST /chat (multipart, wire.rs)
//!     → reqwest::Error → TransportError (tagged, classified later)
//! ```

pub mod client;
pub mod wire;

pub use client::{ChatBackend, HttpBackend};
pub use wire::{BackendReply, ChatRequest, HealthReport, VoicePayload};
