//! Bounded waits around capability calls.

use crate::CapabilityError;
use std::future::Future;
use std::time::Duration;

/// Awaits `call`, failing with [`CapabilityError::Timeout`] once `limit`
/// elapses. `None` waits indefinitely.
pub async fn with_deadline<T, F>(
    capability: &'static str,
    limit: Option<Duration>,
    call: F,
) -> Result<T, CapabilityError>
where
    F: Future<Output = Result<T, CapabilityError>>,
{
    let Some(limit) = limit else {
        return call.await;
    };

    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                capability,
                limit_ms = limit.as_millis() as u64,
                "capability call exceeded its bounded wait"
            );
            Err(CapabilityError::Timeout {
                capability,
                elapsed_ms: limit.as_millis() as u64,
            })
        }
    }
}
