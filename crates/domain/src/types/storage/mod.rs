//! Per-resource configuration records.
//!
//! Every record is a flat set of optional fields grouped into families
//! (location, secret, identity, resource name). Which family combination is
//! populated decides the connection strategy; the classifier in
//! `storekeeper-core` enforces that exactly one combination is present.

mod blob;
mod cosmos;
mod sql;
mod table;

pub use blob::BlobContainerConfiguration;
pub use cosmos::CosmosContainerConfiguration;
pub use sql::SqlDatabaseConfiguration;
pub use table::TableConfiguration;

/// A configuration carrying a resource-name field that may be left empty in a
/// base configuration and filled in per request.
pub trait ResourceNamed: Sized {
    /// Name of the resource field, for messages.
    const RESOURCE_FIELD: &'static str;

    /// The resource name, if set.
    fn resource_name(&self) -> Option<&str>;

    /// Copy of this configuration with the resource name cleared.
    #[must_use]
    fn without_resource_name(&self) -> Self;
}
