use std::future::Future;
use std::time::Duration;

use crate::core::config::Settings;
use crate::core::metrics::COMMIT_RETRIES;
use crate::services::errors::AttemptError;
use crate::store::StoreError;

/// Re-runs `operation` while storage reports a write conflict, with linear backoff.
/// Any other failure is returned at once.
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    settings: &Settings,
    label: &'static str,
    mut operation: F,
) -> Result<T, AttemptError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_retries = settings.attempts().max_commit_retries;
    let backoff_ms = settings.attempts().commit_retry_backoff_ms;
    let mut retries = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_conflict() && retries < max_retries => {
                retries += 1;
                metrics::counter!(COMMIT_RETRIES, "operation" => label).increment(1);
                tracing::warn!(operation = label, retry = retries, error = %err, "Storage conflict, retrying");
                tokio::time::sleep(Duration::from_millis(backoff_ms * u64::from(retries))).await;
            }
            Err(err) if err.is_conflict() => {
                tracing::error!(operation = label, error = %err, "Storage conflict retries exhausted");
                return Err(AttemptError::PersistenceConflict { attempts: retries + 1 });
            }
            Err(err) => return Err(err.into()),
        }
    }
}
