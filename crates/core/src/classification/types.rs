//! Connection strategy types.

use std::fmt;

use storekeeper_domain::{ClientIdentityConfiguration, KeyVaultSecretConfiguration};

/// The connection strategies a configuration can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigurationType {
    ConnectionStringAsPlainText,
    ConnectionStringInKeyVault,
    AccountNameAndAccessKeyAsPlainText,
    AccountNameAndAccessKeyInKeyVault,
    AccountNameAndClientIdentity,
    AccountUriAndAccessKeyAsPlainText,
    AccountUriAndAccessKeyInKeyVault,
    AccountUriAndClientIdentity,
}

impl ConfigurationType {
    /// Stable name used in messages.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionStringAsPlainText => "ConnectionStringAsPlainText",
            Self::ConnectionStringInKeyVault => "ConnectionStringInKeyVault",
            Self::AccountNameAndAccessKeyAsPlainText => "AccountNameAndAccessKeyAsPlainText",
            Self::AccountNameAndAccessKeyInKeyVault => "AccountNameAndAccessKeyInKeyVault",
            Self::AccountNameAndClientIdentity => "AccountNameAndClientIdentity",
            Self::AccountUriAndAccessKeyAsPlainText => "AccountUriAndAccessKeyAsPlainText",
            Self::AccountUriAndAccessKeyInKeyVault => "AccountUriAndAccessKeyInKeyVault",
            Self::AccountUriAndClientIdentity => "AccountUriAndClientIdentity",
        }
    }
}

impl fmt::Display for ConfigurationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an account is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Account<'a> {
    /// Storage account name; the endpoint is derived from it.
    Name(&'a str),
    /// Full account endpoint.
    Uri(&'a str),
}

/// A classified configuration, borrowing exactly the fields its strategy
/// needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStrategy<'a> {
    ConnectionStringAsPlainText(&'a str),
    ConnectionStringInKeyVault(&'a KeyVaultSecretConfiguration),
    AccessKeyAsPlainText { account: Account<'a>, access_key: &'a str },
    AccessKeyInKeyVault { account: Account<'a>, secret: &'a KeyVaultSecretConfiguration },
    ClientIdentity { account: Account<'a>, identity: &'a ClientIdentityConfiguration },
}

impl ConnectionStrategy<'_> {
    /// The fieldless type of this strategy.
    pub const fn configuration_type(&self) -> ConfigurationType {
        match self {
            Self::ConnectionStringAsPlainText(_) => ConfigurationType::ConnectionStringAsPlainText,
            Self::ConnectionStringInKeyVault(_) => ConfigurationType::ConnectionStringInKeyVault,
            Self::AccessKeyAsPlainText { account: Account::Name(_), .. } => {
                ConfigurationType::AccountNameAndAccessKeyAsPlainText
            }
            Self::AccessKeyAsPlainText { account: Account::Uri(_), .. } => {
                ConfigurationType::AccountUriAndAccessKeyAsPlainText
            }
            Self::AccessKeyInKeyVault { account: Account::Name(_), .. } => {
                ConfigurationType::AccountNameAndAccessKeyInKeyVault
            }
            Self::AccessKeyInKeyVault { account: Account::Uri(_), .. } => {
                ConfigurationType::AccountUriAndAccessKeyInKeyVault
            }
            Self::ClientIdentity { account: Account::Name(_), .. } => {
                ConfigurationType::AccountNameAndClientIdentity
            }
            Self::ClientIdentity { account: Account::Uri(_), .. } => {
                ConfigurationType::AccountUriAndClientIdentity
            }
        }
    }
}
