//! Handling of secret material fetched at runtime.

pub mod secret;

pub use secret::SecretValue;
