//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap forwarding calls with the per-service request timeout
//! - Turn an expired deadline into a failure outcome
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future cancels the call
//! - Timeout errors are distinct from transport errors

use std::future::Future;
use std::time::Duration;

use crate::http::forward::ForwardError;

/// Run `fut` with a deadline. Registration rejects a zero limit, so every
/// forward is bounded.
pub async fn with_deadline<F, T>(limit: Duration, fut: F) -> Result<T, ForwardError>
where
    F: Future<Output = Result<T, ForwardError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ForwardError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_expires() {
        let result: Result<(), ForwardError> = with_deadline(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ForwardError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_zero_limit_expires_immediately() {
        let result: Result<(), ForwardError> = with_deadline(Duration::ZERO, async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(ForwardError::Timeout(Duration::ZERO)));
    }

    #[tokio::test]
    async fn test_fast_future_passes_through() {
        let result = with_deadline(Duration::from_secs(1), async { Ok::<_, ForwardError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
