//! Identity to credential source resolution with an ambient fallback.

use std::sync::Arc;

use storekeeper_domain::ClientIdentityConfiguration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ports::{CredentialResolver, CredentialSource};
use crate::cancellation::cancellable;
use crate::error::ContextResult;

/// Resolves optional identity descriptors to credential sources.
///
/// Both collaborators are required at construction: the resolver for
/// explicit identities and the service identity used when a configuration
/// names none.
#[derive(Clone)]
pub struct IdentityResolution {
    resolver: Arc<dyn CredentialResolver>,
    service_identity: Arc<dyn CredentialSource>,
}

impl IdentityResolution {
    pub fn new(
        resolver: Arc<dyn CredentialResolver>,
        service_identity: Arc<dyn CredentialSource>,
    ) -> Self {
        Self { resolver, service_identity }
    }

    /// Credential source for `identity`, or the service identity when
    /// `identity` is `None`.
    ///
    /// # Errors
    /// Propagates resolver failures; returns `ContextError::Cancelled` if
    /// `cancel` fires first.
    pub async fn source_for(
        &self,
        identity: Option<&ClientIdentityConfiguration>,
        cancel: &CancellationToken,
    ) -> ContextResult<Arc<dyn CredentialSource>> {
        match identity {
            None => {
                debug!("using service identity");
                Ok(Arc::clone(&self.service_identity))
            }
            Some(identity) => {
                cancellable(cancel, self.resolver.credential_source_for_identity(identity, cancel))
                    .await
            }
        }
    }

    /// Invalidate `identity` with the resolver. `None` is a no-op.
    pub fn invalidate(&self, identity: Option<&ClientIdentityConfiguration>) {
        if let Some(identity) = identity {
            warn!(source_type = ?identity.identity_source_type, "invalidating client identity");
            self.resolver.invalidate_failed_credential(identity);
        }
    }

    /// The service identity's credential source.
    pub fn service_identity(&self) -> &Arc<dyn CredentialSource> {
        &self.service_identity
    }
}

#[cfg(test)]
mod tests {
    use storekeeper_domain::ClientIdentitySourceType;

    use super::*;
    use crate::testing::{FakeCredentialResolver, FakeCredentialSource};

    /// Validates `IdentityResolution::source_for` behavior for the absent
    /// identity scenario.
    ///
    /// Assertions:
    /// - The service identity is returned.
    /// - The resolver is never consulted.
    #[tokio::test]
    async fn test_absent_identity_uses_service_identity() {
        let resolver = Arc::new(FakeCredentialResolver::new());
        let service: Arc<dyn CredentialSource> = Arc::new(FakeCredentialSource::available("svc"));
        let identities = IdentityResolution::new(resolver.clone(), Arc::clone(&service));

        let source = identities.source_for(None, &CancellationToken::new()).await.unwrap();

        assert!(Arc::ptr_eq(&source, &service));
        assert!(resolver.resolved_identities().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_identity_goes_to_resolver() {
        let resolver = Arc::new(FakeCredentialResolver::new());
        let identities = IdentityResolution::new(
            resolver.clone(),
            Arc::new(FakeCredentialSource::available("svc")),
        );
        let identity = ClientIdentityConfiguration::of_type(ClientIdentitySourceType::AzureCli);

        identities.source_for(Some(&identity), &CancellationToken::new()).await.unwrap();
        identities.invalidate(Some(&identity));
        identities.invalidate(None);

        assert_eq!(resolver.resolved_identities(), vec![identity.clone()]);
        assert_eq!(resolver.invalidated_identities(), vec![identity]);
    }
}
