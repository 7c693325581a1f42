//! Retry logic with exponential backoff for release API calls.

use crate::config::RetryConfig;
use crate::error::{ReleaseApiError, ReleaseError, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Retry an API call with exponential backoff.
///
/// Only transient failures (transport errors, 408, 429, 5xx) are retried, at
/// most `retry.github_api` times. Cancelling `cancel` aborts the in-flight call
/// or the pending backoff.
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    retry: &RetryConfig,
    operation_name: &str,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, ReleaseApiError>>,
{
    let mut attempts = 0;

    loop {
        let outcome = tokio::select! {
            outcome = operation() => outcome,
            _ = cancel.cancelled() => return Err(cancelled(operation_name)),
        };

        let err = match outcome {
            Ok(value) => {
                if attempts > 0 {
                    log::info!("{operation_name} succeeded after {attempts} retry(ies)");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_transient() || attempts >= retry.github_api {
            return Err(ReleaseError::ReleaseApi(err));
        }

        attempts += 1;
        let wait = retry.delay_for(attempts);
        log::warn!(
            "{operation_name} failed (attempt {attempts}/{}): {err}; retrying in {:.1}s",
            retry.github_api + 1,
            wait.as_secs_f64()
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => return Err(cancelled(operation_name)),
        }
    }
}

fn cancelled(operation_name: &str) -> ReleaseError {
    ReleaseError::Cancelled {
        stage: operation_name.to_string(),
    }
}
