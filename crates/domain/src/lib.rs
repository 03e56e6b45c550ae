//! # Storekeeper Domain
//!
//! Configuration value types for storekeeper.
//!
//! This crate contains:
//! - Per-resource configuration records (blob, Cosmos, table, SQL)
//! - Identity and vault secret descriptors
//! - Factory settings (retry window, logging)
//!
//! ## Architecture
//! - No dependencies on other storekeeper crates
//! - Only external dependencies allowed
//! - Pure value types: deriving a variant is a copy, never a mutation

pub mod config;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use types::*;
