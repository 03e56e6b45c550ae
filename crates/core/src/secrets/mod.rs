//! Vault-backed secret retrieval.

pub mod fetcher;
pub mod ports;

pub use fetcher::{FetchedSecret, SecretFetcher};
pub use ports::SecretStore;
