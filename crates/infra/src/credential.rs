//! Credentials carried by storage handles.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use storekeeper_common::SecretValue;
use storekeeper_core::TokenCredential;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SharedKeyError {
    #[error("account name must not be empty")]
    MissingAccountName,

    #[error("access key for account {account_name} is not valid base64")]
    InvalidKey { account_name: String },
}

/// Account name and decoded access key.
///
/// The key is checked once at construction; a handle never holds a key that
/// could not sign a request.
#[derive(Clone)]
pub struct StorageSharedKeyCredential {
    account_name: String,
    account_key: SecretValue,
}

impl StorageSharedKeyCredential {
    /// # Errors
    /// Returns `SharedKeyError` for a blank account name or a key that is
    /// not valid base64.
    pub fn new(
        account_name: impl Into<String>,
        account_key: &SecretValue,
    ) -> Result<Self, SharedKeyError> {
        let account_name = account_name.into();
        if account_name.trim().is_empty() {
            return Err(SharedKeyError::MissingAccountName);
        }
        if STANDARD.decode(account_key.expose().trim()).is_err() {
            return Err(SharedKeyError::InvalidKey { account_name });
        }
        Ok(Self { account_name, account_key: account_key.clone() })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn account_key(&self) -> &SecretValue {
        &self.account_key
    }
}

impl fmt::Debug for StorageSharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSharedKeyCredential")
            .field("account_name", &self.account_name)
            .finish_non_exhaustive()
    }
}

/// How a handle authenticates.
#[derive(Debug, Clone)]
pub enum StorageCredential {
    SharedKey(StorageSharedKeyCredential),
    SharedAccessSignature(SecretValue),
    Token(Arc<dyn TokenCredential>),
}

/// Where a handle's credential came from, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Account key from the configuration or a vault.
    SharedKey,
    /// Token credential from a client identity.
    Token,
    /// Credential embedded in a connection string.
    ConnectionString,
    /// The local storage emulator.
    DevelopmentStorage,
}

impl CredentialKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SharedKey => "SharedKey",
            Self::Token => "Token",
            Self::ConnectionString => "ConnectionString",
            Self::DevelopmentStorage => "DevelopmentStorage",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
