use serde::{Deserialize, Serialize};

use super::ResourceNamed;
use crate::types::{ClientIdentityConfiguration, KeyVaultSecretConfiguration};

/// Settings for a Cosmos DB container.
///
/// Cosmos accounts are addressed by URI rather than name, and every
/// connection strategy requires `database`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CosmosContainerConfiguration {
    pub database: Option<String>,
    pub account_uri: Option<String>,
    pub access_key_plain_text: Option<String>,
    pub access_key_in_key_vault: Option<KeyVaultSecretConfiguration>,
    pub connection_string_plain_text: Option<String>,
    pub connection_string_in_key_vault: Option<KeyVaultSecretConfiguration>,
    pub client_identity: Option<ClientIdentityConfiguration>,
    pub container: Option<String>,
}

impl CosmosContainerConfiguration {
    /// Copy of this configuration targeting `container`.
    #[must_use]
    pub fn with_container(&self, container: impl Into<String>) -> Self {
        Self { container: Some(container.into()), ..self.clone() }
    }

    /// Copy of this configuration targeting `database`.
    #[must_use]
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self { database: Some(database.into()), ..self.clone() }
    }

    #[must_use]
    pub fn without_container(&self) -> Self {
        Self { container: None, ..self.clone() }
    }
}

impl ResourceNamed for CosmosContainerConfiguration {
    const RESOURCE_FIELD: &'static str = "Container";

    fn resource_name(&self) -> Option<&str> {
        self.container.as_deref()
    }

    fn without_resource_name(&self) -> Self {
        self.without_container()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_container_keeps_database() {
        let config = CosmosContainerConfiguration {
            database: Some("db".to_string()),
            account_uri: Some("https://acct.documents.azure.com:443/".to_string()),
            container: Some("orders".to_string()),
            ..Default::default()
        };
        let parent = config.without_resource_name();
        assert_eq!(parent.database.as_deref(), Some("db"));
        assert_eq!(parent.container, None);
    }
}
