//! Blob storage handles.
//!
//! The service client owns the account endpoint and credential and is
//! shared by every container of the account.

use std::sync::Arc;

use async_trait::async_trait;
use storekeeper_common::RetryDelay;
use storekeeper_core::{
    strategy_for, validate_named, Constructed, ContextError, ContextResult, CredentialSource,
    SecretFetcher, TwoLevelCachingContextFactory, TwoLevelContextBuilder,
};
use storekeeper_domain::{BlobContainerConfiguration, ResourceNamed};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{
    connect_account, invalidate_identities, resource_url, AccountConnection, ResourceNameError,
};
use crate::connection_string::StorageService;
use crate::credential::{CredentialKind, StorageCredential};
use crate::options::BlobClientOptions;

/// Client for one account's blob service.
#[derive(Debug)]
pub struct BlobServiceClient {
    connection: AccountConnection,
    options: Option<Arc<BlobClientOptions>>,
}

impl BlobServiceClient {
    pub fn new(connection: AccountConnection, options: Option<Arc<BlobClientOptions>>) -> Self {
        Self { connection, options }
    }

    /// Service endpoint, always ending in `/`.
    pub fn url(&self) -> &Url {
        &self.connection.endpoint
    }

    pub fn credential(&self) -> &StorageCredential {
        &self.connection.credential
    }

    pub fn credential_kind(&self) -> CredentialKind {
        self.connection.credential_kind
    }

    pub fn options(&self) -> Option<&Arc<BlobClientOptions>> {
        self.options.as_ref()
    }

    /// Client for `container` in this account.
    ///
    /// # Errors
    /// Returns `ResourceNameError` if `container` is not a single path segment.
    pub fn container_client(
        self: &Arc<Self>,
        container: &str,
    ) -> Result<BlobContainerClient, ResourceNameError> {
        let url = resource_url(self.url(), &[container])?;
        Ok(BlobContainerClient { service: Arc::clone(self), name: container.to_string(), url })
    }
}

/// Client for one blob container.
#[derive(Debug)]
pub struct BlobContainerClient {
    service: Arc<BlobServiceClient>,
    name: String,
    url: Url,
}

impl BlobContainerClient {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The shared service client this container was derived from.
    pub fn service_client(&self) -> &Arc<BlobServiceClient> {
        &self.service
    }

    pub fn credential_kind(&self) -> CredentialKind {
        self.service.credential_kind()
    }
}

/// Builds blob service and container clients from
/// [`BlobContainerConfiguration`]s.
#[derive(Clone)]
pub struct BlobContainerClientBuilder {
    fetcher: SecretFetcher,
}

impl BlobContainerClientBuilder {
    pub fn new(fetcher: SecretFetcher) -> Self {
        Self { fetcher }
    }

    /// A caching factory over this builder.
    pub fn into_factory(self, retry_delay: RetryDelay) -> BlobContainerClientFactory {
        TwoLevelCachingContextFactory::with_retry_delay(self, retry_delay)
    }
}

#[async_trait]
impl TwoLevelContextBuilder for BlobContainerClientBuilder {
    type Configuration = BlobContainerConfiguration;
    type Options = BlobClientOptions;
    type Parent = BlobServiceClient;
    type Context = BlobContainerClient;

    const KIND: &'static str = "blob";

    fn validate(&self, configuration: &BlobContainerConfiguration) -> ContextResult<()> {
        validate_named(configuration)
    }

    async fn build_parent(
        &self,
        configuration: BlobContainerConfiguration,
        options: Option<Arc<BlobClientOptions>>,
        cancel: CancellationToken,
    ) -> ContextResult<Constructed<BlobServiceClient>> {
        let strategy = strategy_for(&configuration)?;
        let resolved =
            connect_account(Self::KIND, StorageService::Blob, strategy, &self.fetcher, &cancel)
                .await?;
        Ok(Constructed {
            context: BlobServiceClient::new(resolved.connection, options),
            credential_source: resolved.credential_source,
        })
    }

    async fn build_context(
        &self,
        parent: Arc<BlobServiceClient>,
        configuration: BlobContainerConfiguration,
        _options: Option<Arc<BlobClientOptions>>,
        _cancel: CancellationToken,
    ) -> ContextResult<BlobContainerClient> {
        let container = configuration
            .resource_name()
            .ok_or_else(|| ContextError::construction(Self::KIND, "container name is not set"))?;
        parent.container_client(container).map_err(|e| {
            ContextError::construction(Self::KIND, format!("container {container}: {e}"))
        })
    }

    fn invalidate_for_configuration(
        &self,
        configuration: &BlobContainerConfiguration,
        credential_source: Option<&Arc<dyn CredentialSource>>,
        _options: Option<&Arc<BlobClientOptions>>,
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

/// Two-level caching factory for blob container clients.
pub type BlobContainerClientFactory = TwoLevelCachingContextFactory<BlobContainerClientBuilder>;
