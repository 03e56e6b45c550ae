//! Test doubles for the credential and secret ports.
//!
//! Available to this crate's tests and, through the `test-utils` feature, to
//! downstream crates' tests.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use storekeeper_common::SecretValue;
use storekeeper_domain::ClientIdentityConfiguration;
use tokio_util::sync::CancellationToken;

use crate::credentials::{
    AccessToken, CredentialResolver, CredentialSource, IdentityResolution, TokenCredential,
};
use crate::error::{ContextError, ContextResult};
use crate::secrets::SecretStore;

/// A credential that always returns the same named token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTokenCredential {
    name: String,
}

impl StaticTokenCredential {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _cancel: &CancellationToken,
    ) -> ContextResult<AccessToken> {
        Ok(AccessToken::new(format!("token-{}", self.name), Utc::now() + Duration::hours(1)))
    }
}

/// A credential source that either always or never yields a credential, and
/// counts invalidations.
#[derive(Debug)]
pub struct FakeCredentialSource {
    credential: Option<Arc<StaticTokenCredential>>,
    invalidations: AtomicUsize,
}

impl FakeCredentialSource {
    /// Source yielding a [`StaticTokenCredential`] named `name`.
    pub fn available(name: impl Into<String>) -> Self {
        Self {
            credential: Some(Arc::new(StaticTokenCredential::new(name))),
            invalidations: AtomicUsize::new(0),
        }
    }

    /// Source that never yields a credential.
    pub fn unavailable() -> Self {
        Self { credential: None, invalidations: AtomicUsize::new(0) }
    }

    pub fn invalidation_count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for FakeCredentialSource {
    async fn credential(
        &self,
        _cancel: &CancellationToken,
    ) -> ContextResult<Option<Arc<dyn TokenCredential>>> {
        Ok(self.credential.clone().map(|c| c as Arc<dyn TokenCredential>))
    }

    fn invalidate_failed_credential(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// A resolver that records every identity it resolves and invalidates.
///
/// Each distinct identity gets its own [`FakeCredentialSource`], reused on
/// later resolutions.
#[derive(Debug, Default)]
pub struct FakeCredentialResolver {
    resolved: Mutex<Vec<ClientIdentityConfiguration>>,
    invalidated: Mutex<Vec<ClientIdentityConfiguration>>,
    sources: Mutex<HashMap<ClientIdentityConfiguration, Arc<FakeCredentialSource>>>,
    failure: Mutex<Option<String>>,
}

impl FakeCredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later resolution fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    pub fn resolved_identities(&self) -> Vec<ClientIdentityConfiguration> {
        self.resolved.lock().clone()
    }

    pub fn invalidated_identities(&self) -> Vec<ClientIdentityConfiguration> {
        self.invalidated.lock().clone()
    }

    /// The source handed out for `identity`, if it was resolved.
    pub fn source_for(
        &self,
        identity: &ClientIdentityConfiguration,
    ) -> Option<Arc<FakeCredentialSource>> {
        self.sources.lock().get(identity).cloned()
    }
}

#[async_trait]
impl CredentialResolver for FakeCredentialResolver {
    async fn credential_source_for_identity(
        &self,
        identity: &ClientIdentityConfiguration,
        _cancel: &CancellationToken,
    ) -> ContextResult<Arc<dyn CredentialSource>> {
        self.resolved.lock().push(identity.clone());
        if let Some(message) = self.failure.lock().clone() {
            return Err(ContextError::CredentialResolution(message));
        }
        let source = Arc::clone(self.sources.lock().entry(identity.clone()).or_insert_with(|| {
            Arc::new(FakeCredentialSource::available(format!(
                "{:?}",
                identity.identity_source_type
            )))
        }));
        Ok(source)
    }

    fn invalidate_failed_credential(&self, identity: &ClientIdentityConfiguration) {
        self.invalidated.lock().push(identity.clone());
    }
}

/// An in-memory vault keyed by vault URI and secret name.
#[derive(Debug, Default)]
pub struct FakeSecretStore {
    secrets: Mutex<HashMap<(String, String), String>>,
    failure: Mutex<Option<ContextError>>,
    calls: AtomicUsize,
}

impl FakeSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` as `secret_name` in the vault called `vault_name`.
    pub fn insert(&self, vault_name: &str, secret_name: &str, value: &str) {
        let uri = format!("https://{vault_name}.vault.azure.net/");
        self.secrets.lock().insert((uri, secret_name.to_string()), value.to_string());
    }

    /// Make every later read fail with `error`.
    pub fn fail_with(&self, error: ContextError) {
        *self.failure.lock() = Some(error);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn get_secret(
        &self,
        vault_uri: &str,
        secret_name: &str,
        _credential: Arc<dyn TokenCredential>,
        _cancel: &CancellationToken,
    ) -> ContextResult<SecretValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.secrets
            .lock()
            .get(&(vault_uri.to_string(), secret_name.to_string()))
            .map(|v| SecretValue::new(v.as_str()))
            .ok_or_else(|| ContextError::secret_not_found(vault_uri, secret_name))
    }
}

/// Identity resolution wired to fakes, with the fakes returned for
/// inspection.
pub struct TestIdentities {
    pub resolution: IdentityResolution,
    pub resolver: Arc<FakeCredentialResolver>,
    pub service_identity: Arc<FakeCredentialSource>,
}

impl TestIdentities {
    pub fn new() -> Self {
        let resolver = Arc::new(FakeCredentialResolver::new());
        let service_identity = Arc::new(FakeCredentialSource::available("service"));
        let resolution = IdentityResolution::new(
            Arc::clone(&resolver) as Arc<dyn CredentialResolver>,
            Arc::clone(&service_identity) as Arc<dyn CredentialSource>,
        );
        Self { resolution, resolver, service_identity }
    }
}

impl Default for TestIdentities {
    fn default() -> Self {
        Self::new()
    }
}
