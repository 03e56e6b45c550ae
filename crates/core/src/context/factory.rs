//! Caching context factory.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use storekeeper_common::RetryDelay;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::construction::{completed_value, ConstructionCache};
use super::key::{configuration_cache_key, context_cache_key};
use super::options::ConnectionOptionsRegistry;
use crate::credentials::CredentialSource;
use crate::error::ContextResult;

/// A freshly built value plus the credential source it was built with.
pub struct Constructed<C> {
    pub context: C,
    pub credential_source: Option<Arc<dyn CredentialSource>>,
}

impl<C> Constructed<C> {
    /// A value built without a tracked credential source.
    pub fn new(context: C) -> Self {
        Self { context, credential_source: None }
    }

    #[must_use]
    pub fn with_credential_source(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.credential_source = Some(source);
        self
    }
}

/// What a cache entry holds once its construction succeeds.
pub struct CachedContext<C> {
    pub context: Arc<C>,
    pub credential_source: Option<Arc<dyn CredentialSource>>,
}

impl<C> From<Constructed<C>> for CachedContext<C> {
    fn from(constructed: Constructed<C>) -> Self {
        Self {
            context: Arc::new(constructed.context),
            credential_source: constructed.credential_source,
        }
    }
}

/// Builds handles of one resource kind from configurations.
#[async_trait]
pub trait ContextBuilder: Send + Sync + 'static {
    type Configuration: Serialize + Clone + Send + Sync + 'static;
    type Options: Send + Sync + 'static;
    type Context: Send + Sync + 'static;

    /// Resource kind, for logs.
    const KIND: &'static str;

    /// Reject configurations that can never build, before the cache is
    /// touched. Failures here are never cached.
    ///
    /// # Errors
    /// Returns `ContextError::InvalidConfiguration`.
    fn validate(&self, _configuration: &Self::Configuration) -> ContextResult<()> {
        Ok(())
    }

    /// Cache key for a configuration's content.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be serialized.
    fn cache_key_for_configuration(
        &self,
        configuration: &Self::Configuration,
    ) -> ContextResult<String> {
        configuration_cache_key(configuration)
    }

    /// Build a handle.
    ///
    /// `cancel` is the owning factory's shutdown token, not a caller's.
    ///
    /// # Errors
    /// Returns whatever step of the construction failed.
    async fn build(
        &self,
        configuration: Self::Configuration,
        options: Option<Arc<Self::Options>>,
        cancel: CancellationToken,
    ) -> ContextResult<Constructed<Self::Context>>;

    /// Invalidate credentials associated with `configuration` before a
    /// replacement is built.
    ///
    /// `credential_source` is the source tracked on the evicted entry, when
    /// that entry had completed successfully.
    fn invalidate_for_configuration(
        &self,
        configuration: &Self::Configuration,
        credential_source: Option<&Arc<dyn CredentialSource>>,
        options: Option<&Arc<Self::Options>>,
    );
}

/// Memoizes handle construction per configuration and options instance.
pub struct CachingContextFactory<B: ContextBuilder> {
    builder: Arc<B>,
    cache: ConstructionCache<CachedContext<B::Context>>,
    options: ConnectionOptionsRegistry<B::Options>,
}

impl<B: ContextBuilder> CachingContextFactory<B> {
    pub fn new(builder: B) -> Self {
        Self::with_retry_delay(builder, RetryDelay::default())
    }

    pub fn with_retry_delay(builder: B, retry_delay: RetryDelay) -> Self {
        Self {
            builder: Arc::new(builder),
            cache: ConstructionCache::new(B::KIND, retry_delay, CancellationToken::new()),
            options: ConnectionOptionsRegistry::new(),
        }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// Full cache key: configuration key, `/`, options surrogate.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be serialized.
    pub fn cache_key(
        &self,
        configuration: &B::Configuration,
        options: Option<&Arc<B::Options>>,
    ) -> ContextResult<String> {
        let configuration_key = self.builder.cache_key_for_configuration(configuration)?;
        Ok(context_cache_key(&configuration_key, &self.options.key_for(options)))
    }

    /// Get the handle for `configuration`, building it at most once per
    /// cache generation.
    ///
    /// # Errors
    /// Returns validation errors before any I/O, otherwise the
    /// construction's error or `ContextError::Cancelled`.
    #[instrument(skip_all, fields(kind = B::KIND))]
    pub async fn get_context(
        &self,
        configuration: &B::Configuration,
        options: Option<Arc<B::Options>>,
        cancel: &CancellationToken,
    ) -> ContextResult<Arc<B::Context>> {
        self.builder.validate(configuration)?;
        let key = self.cache_key(configuration, options.as_ref())?;

        let builder = Arc::clone(&self.builder);
        let shutdown = self.cache.shutdown_token().clone();
        let make = || {
            let builder = Arc::clone(&builder);
            let configuration = configuration.clone();
            let options = options.clone();
            let shutdown = shutdown.clone();
            async move {
                info!(kind = B::KIND, "constructing context");
                builder.build(configuration, options, shutdown).await.map(CachedContext::from)
            }
        };

        let entry = self.cache.get(&key, make, cancel).await?;
        Ok(Arc::clone(&entry.context))
    }

    /// Discard the cached handle for `configuration`, invalidate its
    /// credentials, and build a new one.
    ///
    /// # Errors
    /// Same as [`Self::get_context`].
    #[instrument(skip_all, fields(kind = B::KIND))]
    pub async fn get_replacement_context(
        &self,
        configuration: &B::Configuration,
        options: Option<Arc<B::Options>>,
        cancel: &CancellationToken,
    ) -> ContextResult<Arc<B::Context>> {
        self.builder.validate(configuration)?;
        let key = self.cache_key(configuration, options.as_ref())?;

        let removed = self.cache.remove(&key);
        let tracked = removed
            .as_ref()
            .and_then(completed_value)
            .and_then(|entry| entry.credential_source.clone());
        info!(kind = B::KIND, evicted = removed.is_some(), "replacing context");

        self.builder.invalidate_for_configuration(configuration, tracked.as_ref(), options.as_ref());
        self.get_context(configuration, options, cancel).await
    }

    /// Number of cache entries.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<B: ContextBuilder> Drop for CachingContextFactory<B> {
    fn drop(&mut self) {
        self.cache.shutdown_token().cancel();
    }
}
