//! Configuration records consumed by the context factories.

pub mod identity;
pub mod storage;

pub use identity::{ClientIdentityConfiguration, ClientIdentitySourceType, KeyVaultSecretConfiguration};
pub use storage::{
    BlobContainerConfiguration, CosmosContainerConfiguration, ResourceNamed,
    SqlDatabaseConfiguration, TableConfiguration,
};

/// True when an optional string is set to something other than whitespace.
///
/// Configuration binders frequently produce `Some("")` for keys that are
/// present but empty; those must not count as populated.
pub fn is_populated(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_populated() {
        assert!(is_populated(Some("acct1")));
        assert!(!is_populated(Some("")));
        assert!(!is_populated(Some("   ")));
        assert!(!is_populated(None));
    }
}
