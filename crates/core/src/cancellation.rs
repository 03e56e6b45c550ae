//! Cancellation of waits.
//!
//! Every public operation takes a [`CancellationToken`]. Cancelling it ends
//! the caller's wait with [`ContextError::Cancelled`]; work shared with other
//! callers keeps running.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{ContextError, ContextResult};

/// Await `future` unless `cancel` fires first.
pub async fn cancellable<F, T>(cancel: &CancellationToken, future: F) -> ContextResult<T>
where
    F: Future<Output = ContextResult<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ContextError::Cancelled),
        result = future => result,
    }
}

/// Sleep for `delay` unless `cancel` fires first.
pub async fn cancellable_sleep(
    cancel: &CancellationToken,
    delay: std::time::Duration,
) -> ContextResult<()> {
    cancellable(cancel, async {
        tokio::time::sleep(delay).await;
        Ok(())
    })
    .await
}
