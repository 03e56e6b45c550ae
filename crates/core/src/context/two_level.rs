//! Two-level caching context factory.
//!
//! Some handles are cheap children of an expensive parent: a container
//! client hangs off a service client that owns the connection and the
//! credential. The parent is cached under the configuration with its
//! resource name cleared, so every container of one account shares it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use storekeeper_common::RetryDelay;
use storekeeper_domain::ResourceNamed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::construction::{completed_value, ConstructionCache};
use super::factory::{CachedContext, Constructed};
use super::key::{configuration_cache_key, context_cache_key};
use super::options::ConnectionOptionsRegistry;
use crate::credentials::CredentialSource;
use crate::error::ContextResult;

/// Builds a parent handle and children derived from it.
#[async_trait]
pub trait TwoLevelContextBuilder: Send + Sync + 'static {
    type Configuration: Serialize + ResourceNamed + Clone + Send + Sync + 'static;
    type Options: Send + Sync + 'static;
    type Parent: Send + Sync + 'static;
    type Context: Send + Sync + 'static;

    /// Resource kind, for logs.
    const KIND: &'static str;

    /// Reject configurations that can never build. Failures here are never
    /// cached.
    ///
    /// # Errors
    /// Returns `ContextError::InvalidConfiguration`.
    fn validate(&self, _configuration: &Self::Configuration) -> ContextResult<()> {
        Ok(())
    }

    /// Cache key for the child.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be serialized.
    fn cache_key_for_configuration(
        &self,
        configuration: &Self::Configuration,
    ) -> ContextResult<String> {
        configuration_cache_key(configuration)
    }

    /// Cache key for the parent: the configuration without its resource name.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be serialized.
    fn parent_cache_key_for_configuration(
        &self,
        configuration: &Self::Configuration,
    ) -> ContextResult<String> {
        configuration_cache_key(&configuration.without_resource_name())
    }

    /// Build the parent handle. `configuration` still carries the resource
    /// name of whichever child asked first; it must not influence the parent.
    ///
    /// # Errors
    /// Returns whatever step of the construction failed.
    async fn build_parent(
        &self,
        configuration: Self::Configuration,
        options: Option<Arc<Self::Options>>,
        cancel: CancellationToken,
    ) -> ContextResult<Constructed<Self::Parent>>;

    /// Derive the child handle from its parent.
    ///
    /// # Errors
    /// Returns an error if the child cannot be derived.
    async fn build_context(
        &self,
        parent: Arc<Self::Parent>,
        configuration: Self::Configuration,
        options: Option<Arc<Self::Options>>,
        cancel: CancellationToken,
    ) -> ContextResult<Self::Context>;

    /// Invalidate credentials associated with `configuration` before a
    /// replacement is built.
    fn invalidate_for_configuration(
        &self,
        configuration: &Self::Configuration,
        credential_source: Option<&Arc<dyn CredentialSource>>,
        options: Option<&Arc<Self::Options>>,
    );
}

/// Caches parents and children separately, both single-flight.
pub struct TwoLevelCachingContextFactory<B: TwoLevelContextBuilder> {
    builder: Arc<B>,
    parents: Arc<ConstructionCache<CachedContext<B::Parent>>>,
    contexts: ConstructionCache<CachedContext<B::Context>>,
    options: ConnectionOptionsRegistry<B::Options>,
    shutdown: CancellationToken,
}

impl<B: TwoLevelContextBuilder> TwoLevelCachingContextFactory<B> {
    pub fn new(builder: B) -> Self {
        Self::with_retry_delay(builder, RetryDelay::default())
    }

    pub fn with_retry_delay(builder: B, retry_delay: RetryDelay) -> Self {
        let shutdown = CancellationToken::new();
        Self {
            builder: Arc::new(builder),
            parents: Arc::new(ConstructionCache::new(
                "parent",
                retry_delay,
                shutdown.child_token(),
            )),
            contexts: ConstructionCache::new(B::KIND, retry_delay, shutdown.child_token()),
            options: ConnectionOptionsRegistry::new(),
            shutdown,
        }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// Child and parent cache keys for `configuration` and `options`.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be serialized.
    pub fn cache_keys(
        &self,
        configuration: &B::Configuration,
        options: Option<&Arc<B::Options>>,
    ) -> ContextResult<(String, String)> {
        let options_key = self.options.key_for(options);
        let child = self.builder.cache_key_for_configuration(configuration)?;
        let parent = self.builder.parent_cache_key_for_configuration(configuration)?;
        Ok((context_cache_key(&child, &options_key), context_cache_key(&parent, &options_key)))
    }

    /// Get the child handle for `configuration`, building its parent first
    /// if no cached parent exists.
    ///
    /// # Errors
    /// Returns validation errors before any I/O, otherwise the parent's or
    /// child's construction error, or `ContextError::Cancelled`.
    #[instrument(skip_all, fields(kind = B::KIND))]
    pub async fn get_context(
        &self,
        configuration: &B::Configuration,
        options: Option<Arc<B::Options>>,
        cancel: &CancellationToken,
    ) -> ContextResult<Arc<B::Context>> {
        self.builder.validate(configuration)?;
        let (key, parent_key) = self.cache_keys(configuration, options.as_ref())?;

        let builder = Arc::clone(&self.builder);
        let parents = Arc::clone(&self.parents);
        let shutdown = self.contexts.shutdown_token().clone();
        let make = || {
            let builder = Arc::clone(&builder);
            let parents = Arc::clone(&parents);
            let configuration = configuration.clone();
            let options = options.clone();
            let parent_key = parent_key.clone();
            let shutdown = shutdown.clone();
            async move {
                let parent = resolve_parent(
                    &builder,
                    &parents,
                    &parent_key,
                    &configuration,
                    options.as_ref(),
                    &shutdown,
                )
                .await?;
                info!(kind = B::KIND, "constructing context");
                let context = builder
                    .build_context(Arc::clone(&parent.context), configuration, options, shutdown)
                    .await?;
                Ok(CachedContext {
                    context: Arc::new(context),
                    credential_source: parent.credential_source.clone(),
                })
            }
        };

        let entry = self.contexts.get(&key, make, cancel).await?;
        Ok(Arc::clone(&entry.context))
    }

    /// Discard the cached child and its parent, invalidate the parent's
    /// credentials, and build both again.
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
        let (key, parent_key) = self.cache_keys(configuration, options.as_ref())?;

        let removed_child = self.contexts.remove(&key);
        let removed_parent = self.parents.remove(&parent_key);
        let tracked = removed_parent
            .as_ref()
            .and_then(completed_value)
            .and_then(|entry| entry.credential_source.clone())
            .or_else(|| {
                removed_child
                    .as_ref()
                    .and_then(completed_value)
                    .and_then(|entry| entry.credential_source.clone())
            });
        info!(
            kind = B::KIND,
            evicted = removed_child.is_some(),
            evicted_parent = removed_parent.is_some(),
            "replacing context"
        );

        self.builder.invalidate_for_configuration(configuration, tracked.as_ref(), options.as_ref());
        self.get_context(configuration, options, cancel).await
    }

    /// Number of cached children.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Number of cached parents.
    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }
}

impl<B: TwoLevelContextBuilder> Drop for TwoLevelCachingContextFactory<B> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn resolve_parent<B: TwoLevelContextBuilder>(
    builder: &Arc<B>,
    parents: &ConstructionCache<CachedContext<B::Parent>>,
    parent_key: &str,
    configuration: &B::Configuration,
    options: Option<&Arc<B::Options>>,
    shutdown: &CancellationToken,
) -> ContextResult<Arc<CachedContext<B::Parent>>> {
    let parent_shutdown = parents.shutdown_token().clone();
    let make = || {
        let builder = Arc::clone(builder);
        let configuration = configuration.clone();
        let options = options.cloned();
        let parent_shutdown = parent_shutdown.clone();
        async move {
            info!(kind = B::KIND, "constructing parent");
            builder
                .build_parent(configuration, options, parent_shutdown)
                .await
                .map(CachedContext::from)
        }
    };
    debug!(kind = B::KIND, parent_key, "resolving parent");
    parents.get(parent_key, make, shutdown).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use storekeeper_domain::{ClientIdentityConfiguration, ClientIdentitySourceType};

    use super::*;
    use crate::credentials::IdentityResolution;
    use crate::error::ContextError;
    use crate::testing::TestIdentities;

    #[derive(Debug, Clone, Serialize)]
    struct TestConfiguration {
        account: String,
        identity: Option<ClientIdentityConfiguration>,
        container: Option<String>,
    }

    impl TestConfiguration {
        fn new(account: &str, container: &str) -> Self {
            Self {
                account: account.to_string(),
                identity: Some(ClientIdentityConfiguration::of_type(
                    ClientIdentitySourceType::AzureCli,
                )),
                container: Some(container.to_string()),
            }
        }
    }

    impl ResourceNamed for TestConfiguration {
        const RESOURCE_FIELD: &'static str = "Container";

        fn resource_name(&self) -> Option<&str> {
            self.container.as_deref()
        }

        fn without_resource_name(&self) -> Self {
            Self { container: None, ..self.clone() }
        }
    }

    #[derive(Debug)]
    struct Service {
        account: String,
        serial: usize,
    }

    #[derive(Debug)]
    struct Container {
        service: Arc<Service>,
        name: String,
    }

    struct CountingBuilder {
        parent_builds: AtomicUsize,
        child_builds: AtomicUsize,
        parent_failures: AtomicUsize,
        identities: IdentityResolution,
    }

    #[async_trait]
    impl TwoLevelContextBuilder for CountingBuilder {
        type Configuration = TestConfiguration;
        type Options = ();
        type Parent = Service;
        type Context = Container;

        const KIND: &'static str = "test";

        async fn build_parent(
            &self,
            configuration: TestConfiguration,
            _options: Option<Arc<()>>,
            cancel: CancellationToken,
        ) -> ContextResult<Constructed<Service>> {
            let serial = self.parent_builds.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self
                .parent_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(ContextError::construction("test", "parent failed"));
            }
            let source =
                self.identities.source_for(configuration.identity.as_ref(), &cancel).await?;
            Ok(Constructed::new(Service { account: configuration.account, serial })
                .with_credential_source(source))
        }

        async fn build_context(
            &self,
            parent: Arc<Service>,
            configuration: TestConfiguration,
            _options: Option<Arc<()>>,
            _cancel: CancellationToken,
        ) -> ContextResult<Container> {
            self.child_builds.fetch_add(1, Ordering::SeqCst);
            Ok(Container { service: parent, name: configuration.container.unwrap_or_default() })
        }

        fn invalidate_for_configuration(
            &self,
            configuration: &TestConfiguration,
            credential_source: Option<&Arc<dyn CredentialSource>>,
            _options: Option<&Arc<()>>,
        ) {
            self.identities.invalidate(configuration.identity.as_ref());
            if let Some(source) = credential_source {
                source.invalidate_failed_credential();
            }
        }
    }

    fn factory(parent_failures: usize) -> (TwoLevelCachingContextFactory<CountingBuilder>, TestIdentities) {
        let identities = TestIdentities::new();
        let builder = CountingBuilder {
            parent_builds: AtomicUsize::new(0),
            child_builds: AtomicUsize::new(0),
            parent_failures: AtomicUsize::new(parent_failures),
            identities: identities.resolution.clone(),
        };
        (TwoLevelCachingContextFactory::new(builder), identities)
    }

    /// Validates `TwoLevelCachingContextFactory::get_context` behavior for
    /// two containers of one account.
    ///
    /// Assertions:
    /// - The children differ but share one parent.
    /// - The parent was built once.
    #[tokio::test(start_paused = true)]
    async fn test_containers_share_parent() {
        let (factory, _) = factory(0);
        let cancel = CancellationToken::new();

        let c1 = factory.get_context(&TestConfiguration::new("acct1", "c1"), None, &cancel).await.unwrap();
        let c2 = factory.get_context(&TestConfiguration::new("acct1", "c2"), None, &cancel).await.unwrap();

        assert!(!Arc::ptr_eq(&c1, &c2));
        assert!(Arc::ptr_eq(&c1.service, &c2.service));
        assert_eq!(c1.name, "c1");
        assert_eq!(c2.service.account, "acct1");
        assert_eq!(factory.builder().parent_builds.load(Ordering::SeqCst), 1);
        assert_eq!(factory.len(), 2);
        assert_eq!(factory.parent_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_key_ignores_resource_name() {
        let (factory, _) = factory(0);
        let (child_a, parent_a) =
            factory.cache_keys(&TestConfiguration::new("acct1", "c1"), None).unwrap();
        let (child_b, parent_b) =
            factory.cache_keys(&TestConfiguration::new("acct1", "c2"), None).unwrap();

        assert_ne!(child_a, child_b);
        assert_eq!(parent_a, parent_b);
    }

    /// Validates concurrent first requests for different containers.
    ///
    /// Assertions:
    /// - The shared parent is built exactly once.
    #[tokio::test(start_paused = true)]
    async fn test_concurrent_children_build_parent_once() {
        let (factory, _) = factory(0);
        let factory = Arc::new(factory);

        let mut handles = Vec::new();
        for i in 0..8 {
            let factory = Arc::clone(&factory);
            handles.push(tokio::spawn(async move {
                let config = TestConfiguration::new("acct1", &format!("c{i}"));
                factory.get_context(&config, None, &CancellationToken::new()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(factory.builder().parent_builds.load(Ordering::SeqCst), 1);
        assert_eq!(factory.builder().child_builds.load(Ordering::SeqCst), 8);
    }

    /// Validates `TwoLevelCachingContextFactory::get_replacement_context`
    /// behavior.
    ///
    /// Assertions:
    /// - The client identity and the parent's credential source are
    ///   invalidated.
    /// - The replacement has a freshly built parent.
    #[tokio::test(start_paused = true)]
    async fn test_replacement_rebuilds_parent() {
        let (factory, identities) = factory(0);
        let cancel = CancellationToken::new();
        let config = TestConfiguration::new("acct1", "c1");
        let identity = config.identity.clone().unwrap();

        let original = factory.get_context(&config, None, &cancel).await.unwrap();
        let replacement = factory.get_replacement_context(&config, None, &cancel).await.unwrap();

        assert!(!Arc::ptr_eq(&original, &replacement));
        assert!(!Arc::ptr_eq(&original.service, &replacement.service));
        assert_eq!(replacement.service.serial, 1);
        assert_eq!(identities.resolver.invalidated_identities(), vec![identity.clone()]);
        assert_eq!(identities.resolver.source_for(&identity).unwrap().invalidation_count(), 1);
    }

    /// Validates recovery from a failed parent construction.
    ///
    /// Assertions:
    /// - The first request fails with the parent's error.
    /// - The next request rebuilds the parent and succeeds.
    #[tokio::test(start_paused = true)]
    async fn test_faulted_parent_is_rebuilt() {
        let (factory, _) = factory(1);
        let cancel = CancellationToken::new();
        let config = TestConfiguration::new("acct1", "c1");

        let first = factory.get_context(&config, None, &cancel).await;
        assert!(matches!(first, Err(ContextError::Construction { .. })));

        let second = factory.get_context(&config, None, &cancel).await.unwrap();
        assert_eq!(second.service.serial, 1);
        assert_eq!(factory.builder().parent_builds.load(Ordering::SeqCst), 2);
    }
}
