//! Failure classification.
//!
//! # Responsibilities
//! - Map a transport failure onto a [`FailureKind`]
//! - Fall back to keyword sniffing only for opaque third-party errors
//!
//! # Design Decisions
//! - Classification is advisory: used for metrics and rate-limit bucketing,
//!   never for retry eligibility
//! - 408 counts as a timeout; other 4xx are validation problems

use crate::error::{FailureKind, TransportError};

/// Classify a failure observed at the network boundary.
pub fn classify(err: &TransportError) -> FailureKind {
    match err {
        TransportError::Timeout => FailureKind::Timeout,
        TransportError::Connect(_) => FailureKind::Network,
        TransportError::Status { status, .. } => classify_status(*status),
        TransportError::Decode(_) => FailureKind::Unknown,
        TransportError::Other(message) => classify_message(message),
    }
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> FailureKind {
    match status {
        408 => FailureKind::Timeout,
        400..=499 => FailureKind::Validation,
        500..=599 => FailureKind::Server,
        _ => FailureKind::Unknown,
    }
}

/// Last-resort classification from a free-form error message.
pub fn classify_message(message: &str) -> FailureKind {
    let lower = message.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["abort", "timeout", "timed out", "deadline"]) {
        FailureKind::Timeout
    } else if has(&[
        "fetch",
        "connection refused",
        "connection reset",
        "network",
        "unreachable",
        "dns",
    ]) {
        FailureKind::Network
    } else if let Some(status) = embedded_status(&lower) {
        classify_status(status)
    } else if has(&["validation", "unprocessable", "bad request"]) {
        FailureKind::Validation
    } else {
        FailureKind::Unknown
    }
}

/// First standalone three-digit number in the 400..=599 range.
fn embedded_status(text: &str) -> Option<u16> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|tok| tok.len() == 3)
        .filter_map(|tok| tok.parse::<u16>().ok())
        .find(|code| (400..=599).contains(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_variants() {
        assert_eq!(classify(&TransportError::Timeout), FailureKind::Timeout);
        assert_eq!(
            classify(&TransportError::Connect("refused".into())),
            FailureKind::Network
        );
        assert_eq!(
            classify(&TransportError::Status { status: 502, body: String::new() }),
            FailureKind::Server
        );
        assert_eq!(
            classify(&TransportError::Status { status: 422, body: String::new() }),
            FailureKind::Validation
        );
        assert_eq!(
            classify(&TransportError::Status { status: 408, body: String::new() }),
            FailureKind::Timeout
        );
        assert_eq!(
            classify(&TransportError::Decode("eof".into())),
            FailureKind::Unknown
        );
    }

    #[test]
    fn test_message_sniffing() {
        assert_eq!(classify_message("The operation was aborted"), FailureKind::Timeout);
        assert_eq!(classify_message("Failed to fetch"), FailureKind::Network);
        assert_eq!(
            classify_message("connect: Connection refused (os error 111)"),
            FailureKind::Network
        );
        assert_eq!(classify_message("HTTP 503 Service Unavailable"), FailureKind::Server);
        assert_eq!(classify_message("status=400"), FailureKind::Validation);
        assert_eq!(classify_message("something odd"), FailureKind::Unknown);
        assert_eq!(classify_message("retry 1234 failed"), FailureKind::Unknown);
    }
}
