//! Single-flight construction cache.
//!
//! Each key maps to one shared construction. The construction runs on its
//! own task, so it finishes even if every caller stops waiting. A key's
//! entry is one generation: it ends when the entry is removed, and the next
//! insert starts a new one.

use std::future::Future;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use storekeeper_common::{ErrorClassification, ErrorSeverity, RetryDelay};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn, Level};

use crate::cancellation::{cancellable, cancellable_sleep};
use crate::error::{ContextError, ContextResult};

/// A construction that every waiter on one generation shares.
pub type SharedConstruction<T> = Shared<BoxFuture<'static, ContextResult<Arc<T>>>>;

/// Concurrent map from cache key to shared construction.
pub struct ConstructionCache<T> {
    name: &'static str,
    entries: DashMap<String, SharedConstruction<T>>,
    retry_delay: RetryDelay,
    shutdown: CancellationToken,
}

impl<T> ConstructionCache<T>
where
    T: Send + Sync + 'static,
{
    /// Create a cache. Constructions stop when `shutdown` is cancelled.
    pub fn new(name: &'static str, retry_delay: RetryDelay, shutdown: CancellationToken) -> Self {
        Self { name, entries: DashMap::new(), retry_delay, shutdown }
    }

    /// Token passed to constructions; independent of any caller's token.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Return the entry for `key`, starting `make()` if there is none.
    ///
    /// The second value is true when this call inserted the entry.
    pub fn get_or_start<F, Fut>(&self, key: &str, make: F) -> (SharedConstruction<T>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ContextResult<T>> + Send + 'static,
    {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let construction = self.start(make());
                entry.insert(construction.clone());
                (construction, true)
            }
        }
    }

    fn start<Fut>(&self, work: Fut) -> SharedConstruction<T>
    where
        Fut: Future<Output = ContextResult<T>> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let name = self.name;
        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => Err(ContextError::Cancelled),
                result = work => result.map(Arc::new),
            }
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => Err(ContextError::Internal(format!(
                    "{name} construction task ended abnormally: {join_error}"
                ))),
            }
        }
        .boxed()
        .shared()
    }

    /// Get the value for `key`, constructing it with `make` if needed.
    ///
    /// An entry that already existed and is seen to have failed is evicted;
    /// after a jittered delay the key is looked up once more and whatever
    /// that finds or starts is awaited. That is the only retry.
    ///
    /// # Errors
    /// Returns the construction's error, or `ContextError::Cancelled` if
    /// `cancel` fires while waiting.
    pub async fn get<F, Fut>(
        &self,
        key: &str,
        make: F,
        cancel: &CancellationToken,
    ) -> ContextResult<Arc<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ContextResult<T>> + Send + 'static,
    {
        let (construction, inserted) = self.get_or_start(key, &make);
        debug!(cache = self.name, key, hit = !inserted, "construction lookup");

        let fault = if inserted { None } else { fault_of(&construction) };
        let construction = if let Some(fault) = fault {
            log_eviction(self.name, key, &fault);
            self.evict_if_same(key, &construction);
            let delay = self.retry_delay.sample();
            cancellable_sleep(cancel, delay).await?;
            let (retry, inserted) = self.get_or_start(key, &make);
            debug!(cache = self.name, key, ?delay, inserted, "reattempt");
            retry
        } else {
            construction
        };

        cancellable(cancel, construction).await
    }

    /// Remove `key` only if it still holds `construction`.
    pub fn evict_if_same(&self, key: &str, construction: &SharedConstruction<T>) -> bool {
        self.entries.remove_if(key, |_, current| current.ptr_eq(construction)).is_some()
    }

    /// Remove `key` unconditionally, returning the removed generation.
    pub fn remove(&self, key: &str) -> Option<SharedConstruction<T>> {
        self.entries.remove(key).map(|(_, construction)| construction)
    }

    /// Number of entries, including in-flight and faulted ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The error of a construction that has finished unsuccessfully.
pub fn fault_of<T>(construction: &SharedConstruction<T>) -> Option<ContextError> {
    match construction.clone().now_or_never() {
        Some(Err(fault)) => Some(fault),
        _ => None,
    }
}

/// The value of a construction that has finished successfully.
pub fn completed_value<T>(construction: &SharedConstruction<T>) -> Option<Arc<T>> {
    match construction.clone().now_or_never() {
        Some(Ok(value)) => Some(value),
        _ => None,
    }
}

/// Level a faulted construction is reported at when evicted.
fn eviction_level(fault: &ContextError) -> Level {
    match fault.severity() {
        ErrorSeverity::Info => Level::DEBUG,
        ErrorSeverity::Warning => Level::WARN,
        ErrorSeverity::Error | ErrorSeverity::Critical => Level::ERROR,
    }
}

fn log_eviction(cache: &'static str, key: &str, fault: &ContextError) {
    let retryable = fault.is_retryable();
    let level = eviction_level(fault);
    if level == Level::DEBUG {
        debug!(cache, key, retryable, error = %fault, "evicting faulted construction");
    } else if level == Level::WARN {
        warn!(cache, key, retryable, error = %fault, "evicting faulted construction");
    } else {
        error!(cache, key, retryable, error = %fault, "evicting faulted construction");
    }
}
