//! # Storekeeper Core
//!
//! Resolution of storage configurations into cached, ready-to-use handles.
//!
//! This crate contains:
//! - The configuration classifier
//! - Port interfaces for credentials and vault secrets
//! - The single-flight construction cache and the caching factories
//!
//! ## Architecture Principles
//! - Depends only on `storekeeper-common` and `storekeeper-domain`
//! - No SDK, network or vault code
//! - All external systems via traits
//! - Handle builders for concrete resource kinds live in `storekeeper-infra`

pub mod cancellation;
pub mod classification;
pub mod context;
pub mod credentials;
pub mod error;
pub mod secrets;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use classification::{
    classify, strategy_for, validate_named, Account, Classify, ConfigurationType,
    ConnectionStrategy, ValidationError,
};
pub use context::{
    CachedContext, CachingContextFactory, ConnectionOptionsRegistry, Constructed,
    ContextBuilder, TwoLevelCachingContextFactory, TwoLevelContextBuilder, NO_OPTIONS_KEY,
};
pub use credentials::{
    AccessToken, CredentialResolver, CredentialSource, IdentityResolution, TokenCredential,
};
pub use error::{ContextError, ContextResult};
pub use secrets::{FetchedSecret, SecretFetcher, SecretStore};
