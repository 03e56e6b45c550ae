//! Errors raised while resolving a context.

use storekeeper_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use thiserror::Error;

use crate::classification::ValidationError;

/// Result alias for context resolution.
pub type ContextResult<T> = Result<T, ContextError>;

/// Failure of any step between a configuration and a live handle.
///
/// The type is `Clone` because one failed construction is reported to every
/// caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    /// The configuration is missing, ambiguous, or names no usable strategy.
    #[error("Invalid {configuration}: {source}")]
    InvalidConfiguration { configuration: &'static str, source: ValidationError },

    /// A vault lookup produced no value where one was required.
    #[error("Secret {secret_name} not found in vault {vault_name}")]
    SecretNotFound { vault_name: String, secret_name: String },

    /// The secret store rejected or failed the request.
    #[error("Failed to read secret {secret_name} from {vault}: {message}")]
    SecretStore { vault: String, secret_name: String, message: String, retryable: bool },

    /// An identity could not be exchanged for a credential source.
    #[error("Credential resolution failed: {0}")]
    CredentialResolution(String),

    /// A credential source produced no credential for an identity-based
    /// connection.
    #[error("No credential available for {0}")]
    CredentialUnavailable(String),

    /// The handle constructor rejected its inputs.
    #[error("Failed to construct {kind}: {message}")]
    Construction { kind: &'static str, message: String },

    /// The caller stopped waiting, or the owning factory shut down.
    #[error("Operation cancelled")]
    Cancelled,

    /// A construction task ended without producing a result.
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ContextError {
    /// Construction failure for a handle of `kind`.
    pub fn construction(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Construction { kind, message: message.into() }
    }

    pub fn secret_not_found(vault_name: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self::SecretNotFound { vault_name: vault_name.into(), secret_name: secret_name.into() }
    }

    /// True for errors produced by configuration validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidConfiguration { .. })
    }
}

impl ErrorClassification for ContextError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::SecretStore { retryable, .. } => *retryable,
            Self::Common(e) => e.is_retryable(),
            Self::InvalidConfiguration { .. }
            | Self::SecretNotFound { .. }
            | Self::CredentialResolution(_)
            | Self::CredentialUnavailable(_)
            | Self::Construction { .. }
            | Self::Cancelled
            | Self::Internal(_) => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::SecretStore { retryable: true, .. } => ErrorSeverity::Warning,
            Self::Cancelled => ErrorSeverity::Info,
            Self::Internal(_) => ErrorSeverity::Critical,
            Self::Common(e) => e.severity(),
            _ => ErrorSeverity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ConfigurationType;

    /// Validates `ContextError::InvalidConfiguration` display for the
    /// ambiguous blob configuration scenario.
    ///
    /// Assertions:
    /// - The message names the configuration record and both indicated types.
    #[test]
    fn test_invalid_configuration_message() {
        let err = ContextError::InvalidConfiguration {
            configuration: "BlobContainerConfiguration",
            source: ValidationError::Ambiguous {
                kind: "blob",
                indicated: vec![
                    ConfigurationType::AccountNameAndAccessKeyAsPlainText,
                    ConfigurationType::ConnectionStringAsPlainText,
                ],
            },
        };
        assert_eq!(
            err.to_string(),
            "Invalid BlobContainerConfiguration: blob configuration type is ambiguous because \
             the properties set are for AccountNameAndAccessKeyAsPlainText, \
             ConnectionStringAsPlainText"
        );
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_secret_not_found_message() {
        let err = ContextError::secret_not_found("myvault", "conn");
        assert_eq!(err.to_string(), "Secret conn not found in vault myvault");
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    /// Validates `ContextError` classification for the failures the
    /// construction cache logs on eviction.
    ///
    /// Assertions:
    /// - A throttled vault is a retryable warning.
    /// - Cancellation is informational and an ended task is critical.
    /// - Embedded settings errors delegate to `CommonError`.
    #[test]
    fn test_classification() {
        let throttled = ContextError::SecretStore {
            vault: "myvault".into(),
            secret_name: "conn".into(),
            message: "429".into(),
            retryable: true,
        };
        assert!(throttled.is_retryable());
        assert_eq!(throttled.severity(), ErrorSeverity::Warning);

        assert!(!ContextError::Cancelled.is_retryable());
        assert_eq!(ContextError::Cancelled.severity(), ErrorSeverity::Info);
        assert!(ContextError::Internal("join".into()).is_critical());

        let settings: ContextError = CommonError::config("bad window").into();
        assert!(!settings.is_retryable());
        assert_eq!(settings.severity(), ErrorSeverity::Error);
    }
}
