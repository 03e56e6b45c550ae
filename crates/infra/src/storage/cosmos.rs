//! Cosmos DB handles.
//!
//! The account client is the parent; container handles record their
//! database and are derived from it without further I/O.

use std::sync::Arc;

use async_trait::async_trait;
use storekeeper_common::RetryDelay;
use storekeeper_core::{
    strategy_for, validate_named, Constructed, ContextError, ContextResult, CredentialSource,
    SecretFetcher, TwoLevelCachingContextFactory, TwoLevelContextBuilder,
};
use storekeeper_domain::{CosmosContainerConfiguration, ResourceNamed};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{
    connect_account, invalidate_identities, resource_url, AccountConnection, ResourceNameError,
};
use crate::connection_string::StorageService;
use crate::credential::{CredentialKind, StorageCredential};
use crate::options::CosmosClientOptions;

/// Client for one Cosmos DB account.
#[derive(Debug)]
pub struct CosmosClient {
    connection: AccountConnection,
    options: Option<Arc<CosmosClientOptions>>,
}

impl CosmosClient {
    pub fn new(connection: AccountConnection, options: Option<Arc<CosmosClientOptions>>) -> Self {
        Self { connection, options }
    }

    pub fn endpoint(&self) -> &Url {
        &self.connection.endpoint
    }

    pub fn credential(&self) -> &StorageCredential {
        &self.connection.credential
    }

    pub fn credential_kind(&self) -> CredentialKind {
        self.connection.credential_kind
    }

    pub fn options(&self) -> Option<&Arc<CosmosClientOptions>> {
        self.options.as_ref()
    }

    /// Handle for `container` in `database`.
    ///
    /// # Errors
    /// Returns `ResourceNameError` if either name is not a single path segment.
    pub fn container(
        self: &Arc<Self>,
        database: &str,
        container: &str,
    ) -> Result<CosmosContainer, ResourceNameError> {
        let url = resource_url(self.endpoint(), &["dbs", database, "colls", container])?;
        Ok(CosmosContainer {
            client: Arc::clone(self),
            database: database.to_string(),
            name: container.to_string(),
            url,
        })
    }
}

/// Handle for one Cosmos DB container.
#[derive(Debug)]
pub struct CosmosContainer {
    client: Arc<CosmosClient>,
    database: String,
    name: String,
    url: Url,
}

impl CosmosContainer {
    /// Container id.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Resource URL, `{endpoint}dbs/{database}/colls/{container}`.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn client(&self) -> &Arc<CosmosClient> {
        &self.client
    }

    pub fn credential_kind(&self) -> CredentialKind {
        self.client.credential_kind()
    }
}

/// Builds Cosmos clients and container handles from
/// [`CosmosContainerConfiguration`]s.
#[derive(Clone)]
pub struct CosmosContainerBuilder {
    fetcher: SecretFetcher,
}

impl CosmosContainerBuilder {
    pub fn new(fetcher: SecretFetcher) -> Self {
        Self { fetcher }
    }

    /// A caching factory over this builder.
    pub fn into_factory(self, retry_delay: RetryDelay) -> CosmosContainerFactory {
        TwoLevelCachingContextFactory::with_retry_delay(self, retry_delay)
    }
}

#[async_trait]
impl TwoLevelContextBuilder for CosmosContainerBuilder {
    type Configuration = CosmosContainerConfiguration;
    type Options = CosmosClientOptions;
    type Parent = CosmosClient;
    type Context = CosmosContainer;

    const KIND: &'static str = "cosmos";

    fn validate(&self, configuration: &CosmosContainerConfiguration) -> ContextResult<()> {
        validate_named(configuration)
    }

    async fn build_parent(
        &self,
        configuration: CosmosContainerConfiguration,
        options: Option<Arc<CosmosClientOptions>>,
        cancel: CancellationToken,
    ) -> ContextResult<Constructed<CosmosClient>> {
        let strategy = strategy_for(&configuration)?;
        let resolved =
            connect_account(Self::KIND, StorageService::Cosmos, strategy, &self.fetcher, &cancel)
                .await?;
        Ok(Constructed {
            context: CosmosClient::new(resolved.connection, options),
            credential_source: resolved.credential_source,
        })
    }

    async fn build_context(
        &self,
        parent: Arc<CosmosClient>,
        configuration: CosmosContainerConfiguration,
        _options: Option<Arc<CosmosClientOptions>>,
        _cancel: CancellationToken,
    ) -> ContextResult<CosmosContainer> {
        let container = configuration
            .resource_name()
            .ok_or_else(|| ContextError::construction(Self::KIND, "container name is not set"))?;
        let database = configuration
            .database
            .as_deref()
            .ok_or_else(|| ContextError::construction(Self::KIND, "database is not set"))?;
        parent.container(database, container).map_err(|e| {
            ContextError::construction(Self::KIND, format!("{database}/{container}: {e}"))
        })
    }

    fn invalidate_for_configuration(
        &self,
        configuration: &CosmosContainerConfiguration,
        credential_source: Option<&Arc<dyn CredentialSource>>,
        _options: Option<&Arc<CosmosClientOptions>>,
    ) {
        invalidate_identities(
            self.fetcher.identities(),
            [
                configuration.client_identity.as_ref(),
                configuration
                    .connection_string_in_key_vault
                    .as_ref()
                    .and_then(|s| s.vault_client_identity.as_ref()),
                configuration
                    .access_key_in_key_vault
                    .as_ref()
                    .and_then(|s| s.vault_client_identity.as_ref()),
            ],
            credential_source,
        );
    }
}

/// Two-level caching factory for Cosmos DB containers.
pub type CosmosContainerFactory = TwoLevelCachingContextFactory<CosmosContainerBuilder>;
