//! # Storekeeper Infrastructure
//!
//! Concrete handle builders on top of the `storekeeper-core` factories.
//!
//! This crate contains:
//! - Blob, table, Cosmos and SQL handle types and their builders
//! - Connection-string parsing and the shared-key credential
//! - The settings loader (environment variables or a TOML/JSON file)
//!
//! ## Architecture
//! - Implements the builder traits defined in `storekeeper-core`
//! - Vault access and identity resolution arrive through the core ports
//! - Handles describe where and how to connect; no wire protocol lives here

pub mod config;
pub mod connection_string;
pub mod credential;
pub mod options;
pub mod storage;

// Re-export commonly used items
pub use config::{load, load_from_env, load_from_file, probe_config_paths};
pub use connection_string::{ConnectionString, ConnectionStringError};
pub use credential::{CredentialKind, StorageCredential, StorageSharedKeyCredential};
pub use options::{BlobClientOptions, CosmosClientOptions, TableClientOptions};
pub use storage::ResourceNameError;
pub use storage::blob::{
    BlobContainerClient, BlobContainerClientBuilder, BlobContainerClientFactory, BlobServiceClient,
};
pub use storage::cosmos::{
    CosmosClient, CosmosContainer, CosmosContainerBuilder, CosmosContainerFactory,
};
pub use storage::sql::{SqlConnection, SqlConnectionFactory};
pub use storage::table::{TableClient, TableClientBuilder, TableClientFactory};
