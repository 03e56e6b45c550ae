//! Shared error vocabulary for the storekeeper crates.
//!
//! Three pieces make up the error layer:
//!
//! 1. **`CommonError`**: failures of the shared settings layer (bad values,
//!    unreadable or unparsable settings files).
//! 2. **`ErrorClassification`**: a uniform way to ask an error whether it is
//!    retryable and how loudly it should be reported.
//! 3. **`ErrorSeverity`**: the level used when logging a classified error.
//!
//! Crate-specific errors embed `CommonError` instead of repeating its
//! variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum ContextError {
//!     #[error("secret {secret_name} not found in vault {vault_name}")]
//!     SecretNotFound { vault_name: String, secret_name: String },
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```
//!
//! ## Severity levels
//!
//! | Level | Use Case |
//! |-------|----------|
//! | **Info** | Expected conditions such as a cancelled wait |
//! | **Warning** | Transient failures that a later call may get past |
//! | **Error** | Invalid configuration, failed construction |
//! | **Critical** | Invariant violations, panicked background work |

use std::fmt;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Failures of the shared settings layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Invalid or missing settings
    Config { message: String, field: Option<String> },

    /// Serialization or deserialization errors
    Serialization { message: String, format: Option<String> },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, field } => {
                if let Some(field) = field {
                    write!(f, "Configuration error in field '{}': {}", field, message)
                } else {
                    write!(f, "Configuration error: {}", message)
                }
            }
            Self::Serialization { message, format } => {
                if let Some(format) = format {
                    write!(f, "Serialization error ({}): {}", format, message)
                } else {
                    write!(f, "Serialization error: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for CommonError {}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }
}

impl CommonError {
    /// Create a simple configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Create a configuration error for a specific field
    pub fn config_field<S: Into<String>, F: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    /// Create a serialization error with format information
    pub fn serialization_format<S: Into<String>, F: Into<String>>(format: F, message: S) -> Self {
        Self::Serialization { message: message.into(), format: Some(format.into()) }
    }
}

/// Uniform classification for every error type in the workspace.
///
/// The construction cache consults it when it evicts a failed construction,
/// to pick the log level and record whether the failure looked transient.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient: a throttled vault, a token endpoint
    /// that was briefly unreachable.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

/// Unified severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_format("JSON", err.to_string())
    }
}

impl From<toml::de::Error> for CommonError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization_format("TOML", err.to_string())
    }
}
