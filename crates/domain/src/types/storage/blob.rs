use serde::{Deserialize, Serialize};

use super::ResourceNamed;
use crate::types::{ClientIdentityConfiguration, KeyVaultSecretConfiguration};

/// Settings for a blob container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BlobContainerConfiguration {
    /// Storage account name. Used with an access key or a client identity.
    pub account_name: Option<String>,
    pub access_key_plain_text: Option<String>,
    pub access_key_in_key_vault: Option<KeyVaultSecretConfiguration>,
    pub connection_string_plain_text: Option<String>,
    pub connection_string_in_key_vault: Option<KeyVaultSecretConfiguration>,
    pub client_identity: Option<ClientIdentityConfiguration>,
    /// Container name. Left empty in base configurations that are
    /// specialised per request with [`Self::with_container`].
    pub container: Option<String>,
}

impl BlobContainerConfiguration {
    /// Copy of this configuration targeting `container`.
    #[must_use]
    pub fn with_container(&self, container: impl Into<String>) -> Self {
        Self { container: Some(container.into()), ..self.clone() }
    }

    /// Copy of this configuration with no container set.
    #[must_use]
    pub fn without_container(&self) -> Self {
        Self { container: None, ..self.clone() }
    }
}

impl ResourceNamed for BlobContainerConfiguration {
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

    /// Validates `BlobContainerConfiguration::with_container` behavior for
    /// the base configuration specialisation scenario.
    ///
    /// Assertions:
    /// - The base value is unchanged.
    /// - The derived value differs only in the container.
    #[test]
    fn test_with_container_is_a_copy() {
        let base = BlobContainerConfiguration {
            account_name: Some("acct1".to_string()),
            access_key_plain_text: Some("key1".to_string()),
            ..Default::default()
        };
        let derived = base.with_container("c1");

        assert_eq!(base.container, None);
        assert_eq!(derived.container.as_deref(), Some("c1"));
        assert_eq!(derived.without_container(), base);
        assert_eq!(derived.resource_name(), Some("c1"));
    }

    #[test]
    fn test_deserialize_from_bound_settings() {
        let json = r#"{ "AccountName": "acct1", "AccessKeyPlainText": "key1", "Container": "c1" }"#;
        let config: BlobContainerConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(config.account_name.as_deref(), Some("acct1"));
        assert_eq!(config.container.as_deref(), Some("c1"));
        assert!(config.client_identity.is_none());
    }
}
