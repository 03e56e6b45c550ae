//! Credential resolution.
//!
//! The identity subsystem itself lives outside this crate; these ports are
//! the contract the factories rely on to obtain and invalidate credentials.

pub mod ports;
pub mod resolution;

pub use ports::{AccessToken, CredentialResolver, CredentialSource, TokenCredential};
pub use resolution::IdentityResolution;
