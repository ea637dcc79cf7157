//! Bounded-time execution for external calls.
//!
//! Every call to a remote service (generation, embedding, graph execution)
//! goes through [`with_timeout`] so the calling flow never waits longer than
//! its budget. Expiry drops the in-flight future; the remote side may still
//! complete the work; this bounds the caller's wait, not the backend.

use std::future::Future;
use std::time::Duration;

use crate::{Error, Result};

/// Await `fut` for at most `budget`, mapping expiry to [`Error::Timeout`].
///
/// The `operation` label ends up in the error message so callers can tell
/// which external call blew its budget.
pub async fn with_timeout<F, T>(budget: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(operation, budget)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_inner_value_within_budget() {
        let value = with_timeout(Duration::from_secs(1), "fast op", async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn propagates_inner_error_unchanged() {
        let err = with_timeout(Duration::from_secs(1), "failing op", async {
            Err::<(), _>(Error::Generation("service down".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[tokio::test]
    async fn expiry_yields_timeout_error() {
        let err = with_timeout(Duration::from_millis(20), "slow op", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("slow op"));
    }
}
