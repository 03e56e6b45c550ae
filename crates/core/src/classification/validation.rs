//! Classification predicates per configuration record.
//!
//! Each record evaluates a fixed list of predicates. Every predicate that
//! holds contributes one strategy; zero or several contributions are
//! rejected rather than resolved by priority.

use storekeeper_domain::{
    is_populated, BlobContainerConfiguration, ClientIdentityConfiguration,
    CosmosContainerConfiguration, KeyVaultSecretConfiguration, ResourceNamed,
    SqlDatabaseConfiguration, TableConfiguration,
};
use thiserror::Error;

use super::types::{Account, ConfigurationType, ConnectionStrategy};
use crate::error::{ContextError, ContextResult};

/// Why a configuration could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("must not be null")]
    Missing,

    #[error(
        "unable to determine {kind} configuration type because no suitable properties have been set"
    )]
    NoSuitableProperties { kind: &'static str },

    #[error(
        "{kind} configuration type is ambiguous because the properties set are for {}",
        join_types(.indicated)
    )]
    Ambiguous { kind: &'static str, indicated: Vec<ConfigurationType> },

    /// The connection is valid but the per-request resource name is blank.
    #[error("{field} must be set")]
    MissingResourceName { field: &'static str },
}

fn join_types(types: &[ConfigurationType]) -> String {
    types.iter().map(ConfigurationType::as_str).collect::<Vec<_>>().join(", ")
}

/// A configuration record that describes exactly one connection strategy.
pub trait Classify {
    /// Short resource kind used in validation messages.
    const KIND: &'static str;

    /// Record name used in "Invalid ..." messages.
    const CONFIGURATION_NAME: &'static str;

    /// Every strategy whose predicate holds, in declaration order.
    fn indicated_strategies(&self) -> Vec<ConnectionStrategy<'_>>;

    /// The single strategy this configuration describes.
    ///
    /// # Errors
    /// Returns `ValidationError::NoSuitableProperties` when no predicate
    /// holds and `ValidationError::Ambiguous` when several do.
    fn connection_strategy(&self) -> Result<ConnectionStrategy<'_>, ValidationError> {
        let mut indicated = self.indicated_strategies();
        match indicated.len() {
            0 => Err(ValidationError::NoSuitableProperties { kind: Self::KIND }),
            1 => indicated.pop().ok_or(ValidationError::NoSuitableProperties { kind: Self::KIND }),
            _ => Err(ValidationError::Ambiguous {
                kind: Self::KIND,
                indicated: indicated.iter().map(ConnectionStrategy::configuration_type).collect(),
            }),
        }
    }

    /// The fieldless type of [`Classify::connection_strategy`].
    ///
    /// # Errors
    /// Same as [`Classify::connection_strategy`].
    fn configuration_type(&self) -> Result<ConfigurationType, ValidationError> {
        self.connection_strategy().map(|s| s.configuration_type())
    }
}

/// Classify an optional configuration; `None` is rejected as missing.
///
/// # Errors
/// Returns `ValidationError::Missing` for `None`, otherwise whatever
/// [`Classify::connection_strategy`] returns.
pub fn classify<C: Classify>(
    configuration: Option<&C>,
) -> Result<ConnectionStrategy<'_>, ValidationError> {
    configuration.ok_or(ValidationError::Missing)?.connection_strategy()
}

/// Classify `configuration` for a handle builder, wrapping failures in
/// `ContextError::InvalidConfiguration`.
///
/// # Errors
/// Returns `ContextError::InvalidConfiguration` naming the record type.
pub fn strategy_for<C: Classify>(configuration: &C) -> ContextResult<ConnectionStrategy<'_>> {
    configuration.connection_strategy().map_err(|source| ContextError::InvalidConfiguration {
        configuration: C::CONFIGURATION_NAME,
        source,
    })
}

/// Check that `configuration` classifies and names its resource.
///
/// # Errors
/// Returns `ContextError::InvalidConfiguration` for classification
/// failures and for a blank resource name.
pub fn validate_named<C: Classify + ResourceNamed>(configuration: &C) -> ContextResult<()> {
    strategy_for(configuration)?;
    if is_populated(configuration.resource_name()) {
        Ok(())
    } else {
        Err(ContextError::InvalidConfiguration {
            configuration: C::CONFIGURATION_NAME,
            source: ValidationError::MissingResourceName { field: C::RESOURCE_FIELD },
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| is_populated(Some(*v)))
}

/// Predicates shared by the account-name families (blob and table).
fn account_name_strategies<'a>(
    account_name: &'a Option<String>,
    access_key_plain_text: &'a Option<String>,
    access_key_in_key_vault: Option<&'a KeyVaultSecretConfiguration>,
    client_identity: Option<&'a ClientIdentityConfiguration>,
    connection_string_plain_text: &'a Option<String>,
    connection_string_in_key_vault: Option<&'a KeyVaultSecretConfiguration>,
) -> Vec<ConnectionStrategy<'a>> {
    let mut indicated = Vec::new();
    if let Some(name) = present(account_name) {
        let account = Account::Name(name);
        if let Some(access_key) = present(access_key_plain_text) {
            indicated.push(ConnectionStrategy::AccessKeyAsPlainText { account, access_key });
        }
        if let Some(secret) = access_key_in_key_vault {
            indicated.push(ConnectionStrategy::AccessKeyInKeyVault { account, secret });
        }
        if let Some(identity) = client_identity {
            indicated.push(ConnectionStrategy::ClientIdentity { account, identity });
        }
    }
    if let Some(connection_string) = present(connection_string_plain_text) {
        indicated.push(ConnectionStrategy::ConnectionStringAsPlainText(connection_string));
    }
    if let Some(secret) = connection_string_in_key_vault {
        indicated.push(ConnectionStrategy::ConnectionStringInKeyVault(secret));
    }
    indicated
}

impl Classify for BlobContainerConfiguration {
    const KIND: &'static str = "blob";
    const CONFIGURATION_NAME: &'static str = "BlobContainerConfiguration";

    fn indicated_strategies(&self) -> Vec<ConnectionStrategy<'_>> {
        account_name_strategies(
            &self.account_name,
            &self.access_key_plain_text,
            self.access_key_in_key_vault.as_ref(),
            self.client_identity.as_ref(),
            &self.connection_string_plain_text,
            self.connection_string_in_key_vault.as_ref(),
        )
    }
}

impl Classify for TableConfiguration {
    const KIND: &'static str = "table";
    const CONFIGURATION_NAME: &'static str = "TableConfiguration";

    fn indicated_strategies(&self) -> Vec<ConnectionStrategy<'_>> {
        account_name_strategies(
            &self.account_name,
            &self.access_key_plain_text,
            self.access_key_in_key_vault.as_ref(),
            self.client_identity.as_ref(),
            &self.connection_string_plain_text,
            self.connection_string_in_key_vault.as_ref(),
        )
    }
}

impl Classify for CosmosContainerConfiguration {
    const KIND: &'static str = "cosmos";
    const CONFIGURATION_NAME: &'static str = "CosmosContainerConfiguration";

    fn indicated_strategies(&self) -> Vec<ConnectionStrategy<'_>> {
        let mut indicated = Vec::new();
        // Every Cosmos strategy needs a database.
        if present(&self.database).is_none() {
            return indicated;
        }
        if let Some(uri) = present(&self.account_uri) {
            let account = Account::Uri(uri);
            if let Some(access_key) = present(&self.access_key_plain_text) {
                indicated.push(ConnectionStrategy::AccessKeyAsPlainText { account, access_key });
            }
            if let Some(secret) = self.access_key_in_key_vault.as_ref() {
                indicated.push(ConnectionStrategy::AccessKeyInKeyVault { account, secret });
            }
            if let Some(identity) = self.client_identity.as_ref() {
                indicated.push(ConnectionStrategy::ClientIdentity { account, identity });
            }
        }
        if let Some(connection_string) = present(&self.connection_string_plain_text) {
            indicated.push(ConnectionStrategy::ConnectionStringAsPlainText(connection_string));
        }
        if let Some(secret) = self.connection_string_in_key_vault.as_ref() {
            indicated.push(ConnectionStrategy::ConnectionStringInKeyVault(secret));
        }
        indicated
    }
}

impl Classify for SqlDatabaseConfiguration {
    const KIND: &'static str = "sql";
    const CONFIGURATION_NAME: &'static str = "SqlDatabaseConfiguration";

    fn indicated_strategies(&self) -> Vec<ConnectionStrategy<'_>> {
        let mut indicated = Vec::new();
        if let Some(connection_string) = present(&self.connection_string_plain_text) {
            indicated.push(ConnectionStrategy::ConnectionStringAsPlainText(connection_string));
        }
        if let Some(secret) = self.connection_string_in_key_vault.as_ref() {
            indicated.push(ConnectionStrategy::ConnectionStringInKeyVault(secret));
        }
        indicated
    }
}
