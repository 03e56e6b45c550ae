//! Handle builders per storage service.
//!
//! Every builder classifies its configuration once and dispatches on the
//! resulting [`ConnectionStrategy`]. Blob, table and Cosmos share the account
//! resolution below; SQL only accepts connection strings.

pub mod blob;
pub mod cosmos;
pub mod sql;
pub mod table;

use std::fmt;
use std::sync::Arc;

use storekeeper_common::SecretValue;
use storekeeper_core::cancellation::cancellable;
use storekeeper_core::{
    Account, ConnectionStrategy, ContextError, ContextResult, CredentialSource,
    IdentityResolution, SecretFetcher,
};
use storekeeper_domain::ClientIdentityConfiguration;
use tokio_util::sync::CancellationToken;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::connection_string::{
    account_from_endpoint, parse_endpoint, ConnectionString, ConnectionStringCredential,
    StorageService,
};
use crate::credential::{CredentialKind, StorageCredential, StorageSharedKeyCredential};

/// A resource name that cannot be addressed under an account endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceNameError {
    #[error("resource name {name:?} is not a single path segment")]
    NotASegment { name: String },

    #[error("endpoint {endpoint} cannot carry resource paths")]
    OpaqueEndpoint { endpoint: String },
}

/// An account endpoint and the credential to use against it.
#[derive(Debug, Clone)]
pub struct AccountConnection {
    pub endpoint: Url,
    pub credential: StorageCredential,
    pub credential_kind: CredentialKind,
}

/// An account connection plus the credential source used to obtain it.
pub(crate) struct ResolvedAccount {
    pub connection: AccountConnection,
    pub credential_source: Option<Arc<dyn CredentialSource>>,
}

impl ResolvedAccount {
    fn untracked(connection: AccountConnection) -> Self {
        Self { connection, credential_source: None }
    }

    fn tracked(connection: AccountConnection, source: Arc<dyn CredentialSource>) -> Self {
        Self { connection, credential_source: Some(source) }
    }
}

/// Resolve `strategy` to an endpoint and credential for `service`.
///
/// # Errors
/// Returns `ContextError::Construction` for unusable connection strings,
/// endpoints and keys, `ContextError::SecretNotFound` when a vault yields
/// nothing, and `ContextError::CredentialUnavailable` when an identity
/// produces no credential.
pub(crate) async fn connect_account(
    kind: &'static str,
    service: StorageService,
    strategy: ConnectionStrategy<'_>,
    fetcher: &SecretFetcher,
    cancel: &CancellationToken,
) -> ContextResult<ResolvedAccount> {
    match strategy {
        ConnectionStrategy::ConnectionStringAsPlainText(raw) => {
            from_connection_string(kind, service, raw).map(ResolvedAccount::untracked)
        }
        ConnectionStrategy::ConnectionStringInKeyVault(location) => {
            let (secret, source) = fetcher.require_secret(location, cancel).await?;
            let connection = from_connection_string(kind, service, secret.expose())?;
            Ok(ResolvedAccount::tracked(connection, source))
        }
        ConnectionStrategy::AccessKeyAsPlainText { account, access_key } => {
            let connection =
                with_shared_key(kind, service, account, &SecretValue::new(access_key))?;
            Ok(ResolvedAccount::untracked(connection))
        }
        ConnectionStrategy::AccessKeyInKeyVault { account, secret } => {
            let (access_key, source) = fetcher.require_secret(secret, cancel).await?;
            let connection = with_shared_key(kind, service, account, &access_key)?;
            Ok(ResolvedAccount::tracked(connection, source))
        }
        ConnectionStrategy::ClientIdentity { account, identity } => {
            let source = fetcher.identities().source_for(Some(identity), cancel).await?;
            let credential = cancellable(cancel, source.credential(cancel))
                .await?
                .ok_or_else(|| {
                    ContextError::CredentialUnavailable(format!(
                        "{kind} account {}",
                        account_label(account)
                    ))
                })?;
            let connection = AccountConnection {
                endpoint: account_endpoint(kind, service, account)?,
                credential: StorageCredential::Token(credential),
                credential_kind: CredentialKind::Token,
            };
            Ok(ResolvedAccount::tracked(connection, source))
        }
    }
}

/// Invalidate every identity a configuration names, then the credential
/// source tracked on the evicted handle.
pub(crate) fn invalidate_identities<'a>(
    identities: &IdentityResolution,
    named: impl IntoIterator<Item = Option<&'a ClientIdentityConfiguration>>,
    tracked: Option<&Arc<dyn CredentialSource>>,
) {
    for identity in named {
        identities.invalidate(identity);
    }
    if let Some(source) = tracked {
        source.invalidate_failed_credential();
    }
}

fn from_connection_string(
    kind: &'static str,
    service: StorageService,
    raw: &str,
) -> ContextResult<AccountConnection> {
    let construction = |e: &dyn fmt::Display| ContextError::construction(kind, e.to_string());

    let parsed = ConnectionString::parse(raw).map_err(|e| construction(&e))?;
    let endpoint = parsed.endpoint(service).map_err(|e| construction(&e))?;
    let credential = match parsed.credential(&endpoint).map_err(|e| construction(&e))? {
        ConnectionStringCredential::AccountKey { account_name, account_key } => {
            StorageCredential::SharedKey(
                StorageSharedKeyCredential::new(account_name, &account_key)
                    .map_err(|e| construction(&e))?,
            )
        }
        ConnectionStringCredential::SharedAccessSignature(signature) => {
            StorageCredential::SharedAccessSignature(signature)
        }
    };
    let credential_kind = if parsed.uses_development_storage() {
        CredentialKind::DevelopmentStorage
    } else {
        CredentialKind::ConnectionString
    };
    debug!(kind, %endpoint, %credential_kind, "parsed connection string");

    Ok(AccountConnection { endpoint, credential, credential_kind })
}

fn with_shared_key(
    kind: &'static str,
    service: StorageService,
    account: Account<'_>,
    access_key: &SecretValue,
) -> ContextResult<AccountConnection> {
    let endpoint = account_endpoint(kind, service, account)?;
    let account_name = match account {
        Account::Name(name) => name.to_string(),
        Account::Uri(_) => account_from_endpoint(&endpoint).ok_or_else(|| {
            ContextError::construction(kind, format!("no account name in endpoint {endpoint}"))
        })?,
    };
    let credential = StorageSharedKeyCredential::new(account_name, access_key)
        .map_err(|e| ContextError::construction(kind, e.to_string()))?;

    Ok(AccountConnection {
        endpoint,
        credential: StorageCredential::SharedKey(credential),
        credential_kind: CredentialKind::SharedKey,
    })
}

/// `https://{account}.{service}.core.windows.net/` for account names; the
/// URI itself for account URIs.
fn account_endpoint(
    kind: &'static str,
    service: StorageService,
    account: Account<'_>,
) -> ContextResult<Url> {
    let raw = match account {
        Account::Name(name) if service == StorageService::Cosmos => {
            format!("https://{name}.documents.azure.com/")
        }
        Account::Name(name) => format!("https://{name}.{}.core.windows.net/", service.label()),
        Account::Uri(uri) => uri.to_string(),
    };
    parse_endpoint("account endpoint", &raw)
        .map_err(|e| ContextError::construction(kind, e.to_string()))
}

fn account_label(account: Account<'_>) -> &str {
    match account {
        Account::Name(name) | Account::Uri(name) => name,
    }
}

/// `base` with each of `names` appended as one escaped path segment.
///
/// Names containing `/` or `\`, and the dot segments, are rejected so a
/// resource name can never leave the account endpoint.
pub(crate) fn resource_url(base: &Url, names: &[&str]) -> Result<Url, ResourceNameError> {
    if let Some(name) = names.iter().find(|name| !is_path_segment(name)) {
        return Err(ResourceNameError::NotASegment { name: (*name).to_string() });
    }
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ResourceNameError::OpaqueEndpoint { endpoint: base.to_string() })?
        .pop_if_empty()
        .extend(names);
    Ok(url)
}

fn is_path_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://acct1.blob.core.windows.net/").unwrap()
    }

    /// Validates `resource_url` behavior for names that try to escape the
    /// account endpoint.
    ///
    /// Assertions:
    /// - Host replacement, parent traversal and dot segments are rejected.
    #[test]
    fn test_resource_url_rejects_escaping_names() {
        for name in ["//evil.example/x", "../other", "..", ".", "a/b", "a\\b", ""] {
            assert_eq!(
                resource_url(&base(), &[name]),
                Err(ResourceNameError::NotASegment { name: name.to_string() }),
                "{name:?} should be rejected"
            );
        }
    }

    /// Validates `resource_url` behavior for a name containing a colon.
    ///
    /// Assertions:
    /// - The name stays a path segment under the account host.
    #[test]
    fn test_resource_url_keeps_scheme_like_name_on_account_host() {
        let url = resource_url(&base(), &["a:b"]).unwrap();
        assert_eq!(url.host_str(), Some("acct1.blob.core.windows.net"));
        assert_eq!(url.path(), "/a:b");
    }

    #[test]
    fn test_resource_url_appends_under_endpoint_path() {
        let base = Url::parse("http://127.0.0.1:10002/devstoreaccount1/").unwrap();
        let url = resource_url(&base, &["dbs", "db", "colls", "c 1"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:10002/devstoreaccount1/dbs/db/colls/c%201");
    }

    #[test]
    fn test_resource_url_rejects_opaque_endpoint() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        assert!(matches!(
            resource_url(&base, &["c1"]),
            Err(ResourceNameError::OpaqueEndpoint { .. })
        ));
    }
}
