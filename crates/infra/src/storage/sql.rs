//! SQL database connections.
//!
//! Connections are stateful and never shared, so nothing is cached: every
//! request parses and returns a new connection.

use storekeeper_common::SecretValue;
use storekeeper_core::{
    strategy_for, ConnectionStrategy, ContextError, ContextResult, SecretFetcher,
};
use storekeeper_domain::SqlDatabaseConfiguration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::connection_string::ConnectionString;
use crate::credential::CredentialKind;

const KIND: &str = "sql";

/// An unopened SQL connection description.
#[derive(Debug, Clone)]
pub struct SqlConnection {
    data_source: String,
    database: Option<String>,
    connection_string: SecretValue,
}

impl SqlConnection {
    /// Parse a SQL connection string.
    ///
    /// # Errors
    /// Returns `ContextError::Construction` if the string is malformed or
    /// names no server.
    pub fn from_connection_string(raw: &str) -> ContextResult<Self> {
        let parsed = ConnectionString::parse(raw)
            .map_err(|e| ContextError::construction(KIND, e.to_string()))?;
        let data_source = ["Server", "Data Source", "Address", "Addr"]
            .iter()
            .find_map(|key| parsed.get(key))
            .ok_or_else(|| ContextError::construction(KIND, "connection string names no server"))?
            .to_string();
        let database = ["Database", "Initial Catalog"]
            .iter()
            .find_map(|key| parsed.get(key))
            .map(str::to_string);

        Ok(Self { data_source, database, connection_string: SecretValue::new(raw) })
    }

    /// Server the connection targets, e.g. `tcp:db.example.net,1433`.
    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn connection_string(&self) -> &SecretValue {
        &self.connection_string
    }

    pub fn credential_kind(&self) -> CredentialKind {
        CredentialKind::ConnectionString
    }
}

/// Produces a fresh [`SqlConnection`] per request.
#[derive(Clone)]
pub struct SqlConnectionFactory {
    fetcher: SecretFetcher,
}

impl SqlConnectionFactory {
    pub fn new(fetcher: SecretFetcher) -> Self {
        Self { fetcher }
    }

    /// Build a connection for `configuration`.
    ///
    /// # Errors
    /// Returns `ContextError::InvalidConfiguration` if the configuration does
    /// not describe exactly one connection string, `ContextError::SecretNotFound`
    /// if the vault yields nothing, and construction errors for unusable
    /// connection strings.
    #[instrument(skip_all, fields(kind = KIND))]
    pub async fn get_connection(
        &self,
        configuration: &SqlDatabaseConfiguration,
        cancel: &CancellationToken,
    ) -> ContextResult<SqlConnection> {
        match strategy_for(configuration)? {
            ConnectionStrategy::ConnectionStringAsPlainText(raw) => {
                SqlConnection::from_connection_string(raw)
            }
            ConnectionStrategy::ConnectionStringInKeyVault(location) => {
                let (secret, _source) = self.fetcher.require_secret(location, cancel).await?;
                SqlConnection::from_connection_string(secret.expose())
            }
            other => Err(ContextError::construction(
                KIND,
                format!("unsupported configuration type {}", other.configuration_type()),
            )),
        }
    }

    /// Invalidate the vault identity and build a new connection.
    ///
    /// # Errors
    /// Same as [`Self::get_connection`].
    #[instrument(skip_all, fields(kind = KIND))]
    pub async fn get_replacement_connection(
        &self,
        configuration: &SqlDatabaseConfiguration,
        cancel: &CancellationToken,
    ) -> ContextResult<SqlConnection> {
        info!(kind = KIND, "replacing connection");
        self.fetcher.identities().invalidate(
            configuration
                .connection_string_in_key_vault
                .as_ref()
                .and_then(|s| s.vault_client_identity.as_ref()),
        );
        self.get_connection(configuration, cancel).await
    }
}
