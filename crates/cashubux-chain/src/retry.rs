use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use backoff::future::retry;
use tracing::{debug, warn};

use crate::{CollaboratorError, RetryConfig};

/// Runs `op` until it succeeds, fails permanently, or the retry budget runs out.
///
/// Only [`CollaboratorError::Transient`] is retried. When the budget is spent the
/// last transient error is reported as [`CollaboratorError::RetriesExhausted`].
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    op_name: &str,
    mut op: F,
) -> Result<T, CollaboratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollaboratorError>>,
{
    let attempts = AtomicUsize::new(0);
    let max_attempts = config.max_attempts.max(1);

    let result = retry(config.retry_backoff.clone(), || {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let fut = op();

        async move {
            match fut.await {
                Ok(value) => {
                    debug!("{} succeeded on attempt {}", op_name, attempt);
                    Ok(value)
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    warn!("{} attempt {} failed: {}", op_name, attempt, err);
                    Err(backoff::Error::transient(err))
                }
                Err(err) => Err(backoff::Error::Permanent(err)),
            }
        }
    })
    .await;

    result.map_err(|e| match e {
        CollaboratorError::Transient(last_error) => CollaboratorError::RetriesExhausted {
            attempts: attempts.load(Ordering::SeqCst),
            last_error,
        },
        other => other,
    })
}
