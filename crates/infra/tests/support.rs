//! Shared fixtures for `storekeeper-infra` integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use storekeeper_common::RetryDelay;
use storekeeper_core::testing::{FakeSecretStore, TestIdentities};
use storekeeper_core::SecretFetcher;

/// Valid base64 account key used across tests.
pub const ACCOUNT_KEY: &str = "a2V5MQ==";

/// Fakes wired into a secret fetcher, kept for inspection.
pub struct Harness {
    pub identities: TestIdentities,
    pub store: Arc<FakeSecretStore>,
    pub fetcher: SecretFetcher,
}

impl Harness {
    pub fn new() -> Self {
        let identities = TestIdentities::new();
        let store = Arc::new(FakeSecretStore::new());
        let fetcher = SecretFetcher::new(identities.resolution.clone(), store.clone());
        Self { identities, store, fetcher }
    }

    /// Retry window short enough to keep paused-time tests readable.
    pub fn retry_delay() -> RetryDelay {
        RetryDelay::default()
    }
}
