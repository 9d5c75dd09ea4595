//! Bounded retry for provider round-trips.
//!
//! Transient (`Unreachable`) failures are retried with a short linear
//! backoff up to a fixed attempt budget; every other error is surfaced
//! immediately. There are no retry-forever loops; after the budget is
//! spent the provider is treated as unreachable for the current call.
//! Cancellation is by dropping the future: sleeps and provider calls are
//! both abandoned mid-flight.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::provider::ProviderError;

const BACKOFF_STEP: Duration = Duration::from_millis(50);

pub(crate) async fn with_retry<T, F, Fut>(
    max_attempts: u32,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let attempts = max_attempts.max(1);
    let mut last = ProviderError::Unreachable {
        reason: "no attempts made".to_string(),
    };

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err @ ProviderError::Unreachable { .. }) => {
                debug!(attempt, max_attempts = attempts, %err, "provider attempt failed");
                last = err;
                if attempt < attempts {
                    tokio::time::sleep(BACKOFF_STEP * attempt).await;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Err(last)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn unreachable() -> ProviderError {
        ProviderError::Unreachable {
            reason: "down".to_string(),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(unreachable())
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unreachable())
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Unreachable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(5, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::NotFound { height: 7 })
        })
        .await;
        assert!(matches!(result, Err(ProviderError::NotFound { height: 7 })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
