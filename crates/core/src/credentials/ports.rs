//! Port interfaces for credential resolution

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storekeeper_common::SecretValue;
use storekeeper_domain::ClientIdentityConfiguration;
use tokio_util::sync::CancellationToken;

use crate::error::ContextResult;

/// A bearer token and its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretValue,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<SecretValue>, expires_on: DateTime<Utc>) -> Self {
        Self { token: token.into(), expires_on }
    }

    /// True once `now` has reached the expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_on
    }
}

/// An opaque credential that handles carry to authenticate requests.
#[async_trait]
pub trait TokenCredential: Send + Sync + fmt::Debug {
    /// Obtain a token for `scopes`.
    ///
    /// # Errors
    /// Returns `ContextError::CredentialResolution` if the token endpoint
    /// refuses the request.
    async fn get_token(
        &self,
        scopes: &[&str],
        cancel: &CancellationToken,
    ) -> ContextResult<AccessToken>;
}

/// Produces credentials for one identity on demand.
///
/// Implementations may hand out a different credential on each call, for
/// example after a refresh.
#[async_trait]
pub trait CredentialSource: Send + Sync + fmt::Debug {
    /// Get the current credential.
    ///
    /// # Returns
    /// `None` when this source cannot produce a credential at all, which
    /// callers treat as a configuration gap rather than a failure.
    ///
    /// # Errors
    /// Returns an error if the identity is unavailable.
    async fn credential(
        &self,
        cancel: &CancellationToken,
    ) -> ContextResult<Option<Arc<dyn TokenCredential>>>;

    /// Discard any cached credential after it was rejected downstream.
    fn invalidate_failed_credential(&self);
}

/// Exchanges identity descriptors for credential sources.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Resolve a credential source for `identity`.
    ///
    /// # Arguments
    /// * `identity` - Identity descriptor from a configuration
    /// * `cancel` - Ends the wait when cancelled
    ///
    /// # Errors
    /// Returns `ContextError::CredentialResolution` if the descriptor is
    /// malformed or the identity cannot be reached.
    async fn credential_source_for_identity(
        &self,
        identity: &ClientIdentityConfiguration,
        cancel: &CancellationToken,
    ) -> ContextResult<Arc<dyn CredentialSource>>;

    /// Forget whatever was cached for `identity` so the next resolution
    /// starts from scratch.
    fn invalidate_failed_credential(&self, identity: &ClientIdentityConfiguration);
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_access_token_expiry() {
        let now = Utc::now();
        let token = AccessToken::new("t", now + Duration::minutes(5));
        assert!(!token.is_expired_at(now));
        assert!(token.is_expired_at(now + Duration::minutes(5)));
        assert_eq!(format!("{:?}", token.token), "SecretValue(***)");
    }
}
