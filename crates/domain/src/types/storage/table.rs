use serde::{Deserialize, Serialize};

use super::ResourceNamed;
use crate::types::{ClientIdentityConfiguration, KeyVaultSecretConfiguration};

/// Settings for a table in a storage account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TableConfiguration {
    pub account_name: Option<String>,
    pub access_key_plain_text: Option<String>,
    pub access_key_in_key_vault: Option<KeyVaultSecretConfiguration>,
    pub connection_string_plain_text: Option<String>,
    pub connection_string_in_key_vault: Option<KeyVaultSecretConfiguration>,
    pub client_identity: Option<ClientIdentityConfiguration>,
    pub table_name: Option<String>,
}

impl TableConfiguration {
    /// Copy of this configuration targeting `table_name`.
    #[must_use]
    pub fn with_table_name(&self, table_name: impl Into<String>) -> Self {
        Self { table_name: Some(table_name.into()), ..self.clone() }
    }

    #[must_use]
    pub fn without_table_name(&self) -> Self {
        Self { table_name: None, ..self.clone() }
    }
}

impl ResourceNamed for TableConfiguration {
    const RESOURCE_FIELD: &'static str = "TableName";

    fn resource_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    fn without_resource_name(&self) -> Self {
        self.without_table_name()
    }
}
