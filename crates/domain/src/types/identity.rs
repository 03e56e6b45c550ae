//! Identity and vault secret descriptors.
//!
//! These records are interpreted by the credential subsystem; the factories
//! only pass them through and compare them by value when invalidating.

use serde::{Deserialize, Serialize};

/// How a client identity obtains its tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientIdentitySourceType {
    /// Managed identity assigned to the host
    SystemAssignedManaged,
    /// Managed identity selected by client id
    UserAssignedManaged,
    /// The SDK's default credential chain
    AzureIdentityDefaultAzureCredential,
    /// Application registration with a client secret
    ClientIdAndSecret,
    /// Developer login from the Azure CLI
    AzureCli,
    /// Developer login from Visual Studio
    VisualStudio,
    /// Developer login from Visual Studio Code
    VisualStudioCode,
}

/// A federated or managed identity descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClientIdentityConfiguration {
    pub identity_source_type: Option<ClientIdentitySourceType>,
    pub managed_identity_client_id: Option<String>,
    #[serde(rename = "AzureAdTenantId")]
    pub azure_ad_tenant_id: Option<String>,
    #[serde(rename = "AzureAdAppClientId")]
    pub azure_ad_client_id: Option<String>,
    #[serde(rename = "AzureAdAppClientSecretPlainText")]
    pub azure_ad_client_secret_plain_text: Option<String>,
    #[serde(rename = "AzureAdAppClientSecretInKeyVault")]
    pub azure_ad_client_secret_in_key_vault: Option<Box<KeyVaultSecretConfiguration>>,
}

impl ClientIdentityConfiguration {
    /// Identity descriptor for a given source type with no further settings.
    pub fn of_type(source_type: ClientIdentitySourceType) -> Self {
        Self { identity_source_type: Some(source_type), ..Self::default() }
    }

    /// User-assigned managed identity selected by client id.
    pub fn user_assigned(client_id: impl Into<String>) -> Self {
        Self {
            identity_source_type: Some(ClientIdentitySourceType::UserAssignedManaged),
            managed_identity_client_id: Some(client_id.into()),
            ..Self::default()
        }
    }
}

/// Location of a secret in a key vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct KeyVaultSecretConfiguration {
    pub vault_name: String,
    pub secret_name: String,
    /// Identity used to read the vault. The ambient service identity is used
    /// when absent.
    pub vault_client_identity: Option<ClientIdentityConfiguration>,
}

impl KeyVaultSecretConfiguration {
    pub fn new(vault_name: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            vault_name: vault_name.into(),
            secret_name: secret_name.into(),
            vault_client_identity: None,
        }
    }

    /// Copy of this descriptor that reads the vault as `identity`.
    #[must_use]
    pub fn with_vault_client_identity(&self, identity: ClientIdentityConfiguration) -> Self {
        Self { vault_client_identity: Some(identity), ..self.clone() }
    }

    /// Base URI of the vault.
    pub fn vault_uri(&self) -> String {
        format!("https://{}.vault.azure.net/", self.vault_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_uri() {
        let secret = KeyVaultSecretConfiguration::new("myvault", "blob-key");
        assert_eq!(secret.vault_uri(), "https://myvault.vault.azure.net/");
    }

    /// Validates `KeyVaultSecretConfiguration` deserialization for the bound
    /// settings file scenario.
    ///
    /// Assertions:
    /// - PascalCase keys bind, including the nested vault identity.
    #[test]
    fn test_deserialize_pascal_case() {
        let json = r#"{
            "VaultName": "myvault",
            "SecretName": "conn",
            "VaultClientIdentity": { "IdentitySourceType": "SystemAssignedManaged" }
        }"#;
        let secret: KeyVaultSecretConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(secret.vault_name, "myvault");
        assert_eq!(secret.secret_name, "conn");
        assert_eq!(
            secret.vault_client_identity,
            Some(ClientIdentityConfiguration::of_type(
                ClientIdentitySourceType::SystemAssignedManaged
            ))
        );
    }
}
