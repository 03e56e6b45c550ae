//! Port interface for the secret store

use std::sync::Arc;

use async_trait::async_trait;
use storekeeper_common::SecretValue;
use tokio_util::sync::CancellationToken;

use crate::credentials::TokenCredential;
use crate::error::ContextResult;

/// A key vault client.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read `secret_name` from the vault at `vault_uri`.
    ///
    /// # Arguments
    /// * `vault_uri` - Base URI of the vault, e.g. `https://myvault.vault.azure.net/`
    /// * `secret_name` - Name of the secret
    /// * `credential` - Credential to authenticate with
    /// * `cancel` - Ends the wait when cancelled
    ///
    /// # Errors
    /// Returns `ContextError::SecretNotFound` if the vault has no such
    /// secret, or `ContextError::SecretStore` for permission and transport
    /// failures.
    async fn get_secret(
        &self,
        vault_uri: &str,
        secret_name: &str,
        credential: Arc<dyn TokenCredential>,
        cancel: &CancellationToken,
    ) -> ContextResult<SecretValue>;
}
