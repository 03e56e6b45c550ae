use serde::{Deserialize, Serialize};

use crate::types::{ClientIdentityConfiguration, KeyVaultSecretConfiguration};

/// Settings for a SQL database connection.
///
/// Only connection-string strategies exist for SQL; the database is named
/// inside the connection string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SqlDatabaseConfiguration {
    pub connection_string_plain_text: Option<String>,
    pub connection_string_in_key_vault: Option<KeyVaultSecretConfiguration>,
    /// Identity the connection authenticates as, when the connection string
    /// does not carry credentials.
    pub client_identity: Option<ClientIdentityConfiguration>,
}
