//! Error types shared across the client.
//!
//! # Taxonomy
//! ```text
//! validation   bad input, rejected before any network call
//! auth         no identity/session, rejected before any network call
//! network      connection refused / unreachable      (retried)
//! timeout      attempt deadline exceeded              (retried)
//! server       backend answered 5xx                   (retried)
//! queue-full   admission rejected by the dispatcher   (never retried)
//! unknown      anything else                          (retried)
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Classified failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Network,
    Timeout,
    Server,
    Validation,
    Auth,
    QueueFull,
    Unknown,
}

impl FailureKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::Timeout => "timeout",
            FailureKind::Server => "server",
            FailureKind::Validation => "validation",
            FailureKind::Auth => "auth",
            FailureKind::QueueFull => "queue-full",
            FailureKind::Unknown => "unknown",
        }
    }

    /// Short human-readable message shown in the chat surface.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::Network => "Can't reach the assistant right now. Check your connection and try again.",
            FailureKind::Timeout => "The assistant is taking too long to respond. Please try again.",
            FailureKind::Server => "The assistant ran into a problem. Please try again shortly.",
            FailureKind::Validation => "That message couldn't be sent. Please check it and try again.",
            FailureKind::Auth => "Please connect your wallet before chatting.",
            FailureKind::QueueFull => "Too many messages in flight. Please wait a moment.",
            FailureKind::Unknown => "Something went wrong. Please try again.",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic message returned when an error is suppressed by the rate limiter.
pub const FALLBACK_MESSAGE: &str = "I'm having trouble responding right now. I'll keep trying.";

/// A failure observed at the network boundary.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The attempt deadline elapsed (or the request was aborted).
    #[error("request timed out")]
    Timeout,

    /// The backend could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered but the body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Opaque failure from a third-party layer.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Admission failures raised by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The pending queue is at capacity; the newest request is rejected.
    #[error("request queue is full ({capacity} pending)")]
    QueueFull { capacity: usize },

    /// The dispatcher was disposed before the request could complete.
    #[error("dispatcher is closed")]
    Closed,
}

/// The terminal failure of a chat turn, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TurnError {
    /// Classified kind.
    pub kind: FailureKind,
    /// Text to show the user (never raw error internals).
    pub message: String,
    /// False when the rate limiter suppressed the real error and
    /// `message` is the generic fallback.
    pub surfaced: bool,
}

impl TurnError {
    /// A surfaced error carrying the kind's standard message.
    pub fn surfaced(kind: FailureKind) -> Self {
        Self {
            kind,
            message: kind.user_message().to_string(),
            surfaced: true,
        }
    }

    /// A surfaced error with a specific message.
    pub fn with_message(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            surfaced: true,
        }
    }

    /// A suppressed error; the user only sees the fallback text.
    pub fn suppressed(kind: FailureKind) -> Self {
        Self {
            kind,
            message: FALLBACK_MESSAGE.to_string(),
            surfaced: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::Status {
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "backend returned status 503: unavailable");

        let err = DispatchError::QueueFull { capacity: 5 };
        assert!(err.to_string().contains('5'));

        let err = TurnError::suppressed(FailureKind::Server);
        assert_eq!(err.to_string(), FALLBACK_MESSAGE);
        assert!(!err.surfaced);
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&FailureKind::QueueFull).unwrap();
        assert_eq!(json, "\"queue-full\"");
    }
}
