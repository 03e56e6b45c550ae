//! Table storage handles.
//!
//! Single-level: each table client carries its own service client, so
//! nothing is shared between tables.

use std::sync::Arc;

use async_trait::async_trait;
use storekeeper_common::RetryDelay;
use storekeeper_core::{
    strategy_for, validate_named, CachingContextFactory, Constructed, ContextBuilder,
    ContextError, ContextResult, CredentialSource, SecretFetcher,
};
use storekeeper_domain::{ResourceNamed, TableConfiguration};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{
    connect_account, invalidate_identities, resource_url, AccountConnection, ResourceNameError,
};
use crate::connection_string::StorageService;
use crate::credential::{CredentialKind, StorageCredential};
use crate::options::TableClientOptions;

/// Client for one account's table service.
#[derive(Debug)]
pub struct TableServiceClient {
    connection: AccountConnection,
    options: Option<Arc<TableClientOptions>>,
}

impl TableServiceClient {
    pub fn new(connection: AccountConnection, options: Option<Arc<TableClientOptions>>) -> Self {
        Self { connection, options }
    }

    pub fn url(&self) -> &Url {
        &self.connection.endpoint
    }

    pub fn credential(&self) -> &StorageCredential {
        &self.connection.credential
    }

    pub fn credential_kind(&self) -> CredentialKind {
        self.connection.credential_kind
    }

    pub fn options(&self) -> Option<&Arc<TableClientOptions>> {
        self.options.as_ref()
    }

    /// Client for `table`, taking ownership of this service client.
    ///
    /// # Errors
    /// Returns `ResourceNameError` if `table` is not a single path segment.
    pub fn into_table_client(self, table: &str) -> Result<TableClient, ResourceNameError> {
        let url = resource_url(self.url(), &[table])?;
        Ok(TableClient { service: self, name: table.to_string(), url })
    }
}

/// Client for one table.
#[derive(Debug)]
pub struct TableClient {
    service: TableServiceClient,
    name: String,
    url: Url,
}

impl TableClient {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn service_client(&self) -> &TableServiceClient {
        &self.service
    }

    pub fn credential_kind(&self) -> CredentialKind {
        self.service.credential_kind()
    }
}

/// Builds table clients from [`TableConfiguration`]s.
#[derive(Clone)]
pub struct TableClientBuilder {
    fetcher: SecretFetcher,
}

impl TableClientBuilder {
    pub fn new(fetcher: SecretFetcher) -> Self {
        Self { fetcher }
    }

    /// A caching factory over this builder.
    pub fn into_factory(self, retry_delay: RetryDelay) -> TableClientFactory {
        CachingContextFactory::with_retry_delay(self, retry_delay)
    }
}

#[async_trait]
impl ContextBuilder for TableClientBuilder {
    type Configuration = TableConfiguration;
    type Options = TableClientOptions;
    type Context = TableClient;

    const KIND: &'static str = "table";

    fn validate(&self, configuration: &TableConfiguration) -> ContextResult<()> {
        validate_named(configuration)
    }

    async fn build(
        &self,
        configuration: TableConfiguration,
        options: Option<Arc<TableClientOptions>>,
        cancel: CancellationToken,
    ) -> ContextResult<Constructed<TableClient>> {
        let strategy = strategy_for(&configuration)?;
        let resolved =
            connect_account(Self::KIND, StorageService::Table, strategy, &self.fetcher, &cancel)
                .await?;
        let table = configuration
            .resource_name()
            .ok_or_else(|| ContextError::construction(Self::KIND, "table name is not set"))?;
        let client = TableServiceClient::new(resolved.connection, options)
            .into_table_client(table)
            .map_err(|e| ContextError::construction(Self::KIND, format!("table {table}: {e}")))?;

        Ok(Constructed { context: client, credential_source: resolved.credential_source })
    }

    fn invalidate_for_configuration(
        &self,
        configuration: &TableConfiguration,
        credential_source: Option<&Arc<dyn CredentialSource>>,
        _options: Option<&Arc<TableClientOptions>>,
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

/// Caching factory for table clients.
pub type TableClientFactory = CachingContextFactory<TableClientBuilder>;
