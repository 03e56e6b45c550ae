//! Secret fetching: pick a credential, then read the vault.

use std::sync::Arc;

use storekeeper_common::SecretValue;
use storekeeper_domain::KeyVaultSecretConfiguration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::ports::SecretStore;
use crate::cancellation::cancellable;
use crate::credentials::{CredentialSource, IdentityResolution};
use crate::error::{ContextError, ContextResult};

/// Outcome of [`SecretFetcher::fetch_secret`].
#[derive(Debug)]
pub struct FetchedSecret {
    /// `None` when the credential source produced no credential.
    pub value: Option<SecretValue>,
    /// The source used to read the vault, for later invalidation.
    pub credential_source: Arc<dyn CredentialSource>,
}

/// Reads secrets described by [`KeyVaultSecretConfiguration`].
#[derive(Clone)]
pub struct SecretFetcher {
    identities: IdentityResolution,
    store: Arc<dyn SecretStore>,
}

impl SecretFetcher {
    pub fn new(identities: IdentityResolution, store: Arc<dyn SecretStore>) -> Self {
        Self { identities, store }
    }

    /// Identity resolution shared with the handle builders.
    pub fn identities(&self) -> &IdentityResolution {
        &self.identities
    }

    /// Fetch a secret.
    ///
    /// The vault is read with the location's `vault_client_identity`, or the
    /// service identity when that is absent.
    ///
    /// # Returns
    /// A [`FetchedSecret`] whose value is `None` if no credential could be
    /// obtained.
    ///
    /// # Errors
    /// Propagates credential resolution and store errors unchanged;
    /// returns `ContextError::Cancelled` if `cancel` fires first.
    #[instrument(skip_all, fields(vault = %location.vault_name, secret = %location.secret_name))]
    pub async fn fetch_secret(
        &self,
        location: &KeyVaultSecretConfiguration,
        cancel: &CancellationToken,
    ) -> ContextResult<FetchedSecret> {
        let credential_source =
            self.identities.source_for(location.vault_client_identity.as_ref(), cancel).await?;

        let Some(credential) = cancellable(cancel, credential_source.credential(cancel)).await?
        else {
            debug!("no credential available for vault");
            return Ok(FetchedSecret { value: None, credential_source });
        };

        let vault_uri = location.vault_uri();
        let value = cancellable(
            cancel,
            self.store.get_secret(&vault_uri, &location.secret_name, credential, cancel),
        )
        .await?;
        debug!("secret retrieved");

        Ok(FetchedSecret { value: Some(value), credential_source })
    }

    /// Fetch a secret that must exist.
    ///
    /// # Errors
    /// Returns `ContextError::SecretNotFound` when [`Self::fetch_secret`]
    /// yields no value, plus everything it can return.
    pub async fn require_secret(
        &self,
        location: &KeyVaultSecretConfiguration,
        cancel: &CancellationToken,
    ) -> ContextResult<(SecretValue, Arc<dyn CredentialSource>)> {
        let fetched = self.fetch_secret(location, cancel).await?;
        match fetched.value {
            Some(value) => Ok((value, fetched.credential_source)),
            None => Err(ContextError::secret_not_found(
                location.vault_name.clone(),
                location.secret_name.clone(),
            )),
        }
    }
}
