//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound a single backend attempt with a deadline
//! - Cancel the attempt cleanly on timeout (the future is dropped)
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Only the attempt is cancelled; the surrounding retry loop carries on

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

/// Run one attempt under a deadline, mapping expiry to [`TransportError::Timeout`].
pub async fn with_deadline<T, F>(limit: Duration, attempt: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(timeout_ms = limit.as_millis() as u64, "Attempt deadline exceeded");
            Err(TransportError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out() {
        let result: Result<(), _> = with_deadline(Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(6)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(TransportError::Timeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_attempt_passes_through() {
        let result = with_deadline(Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Err::<(), _>(TransportError::Connect("refused".into()))
        })
        .await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
