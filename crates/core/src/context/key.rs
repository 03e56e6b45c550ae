//! Cache key derivation.

use serde::Serialize;
use sha2::{Digest, Sha256};
use storekeeper_common::CommonError;

use crate::error::ContextResult;

/// Digest of a configuration's serialized content.
///
/// Equal content gives equal keys. Hashing keeps plain-text secrets out of
/// keys, which are logged.
///
/// # Errors
/// Returns `ContextError::Common` if the configuration cannot be serialized.
pub fn configuration_cache_key<C: Serialize + ?Sized>(configuration: &C) -> ContextResult<String> {
    let json = serde_json::to_vec(configuration).map_err(CommonError::from)?;
    Ok(hex::encode(Sha256::digest(&json)))
}

/// Full cache key for a configuration key and an options key.
pub fn context_cache_key(configuration_key: &str, options_key: &str) -> String {
    format!("{configuration_key}/{options_key}")
}

#[cfg(test)]
mod tests {
    use storekeeper_domain::BlobContainerConfiguration;

    use super::*;

    fn config(container: &str) -> BlobContainerConfiguration {
        BlobContainerConfiguration {
            account_name: Some("acct1".to_string()),
            access_key_plain_text: Some("key1".to_string()),
            ..Default::default()
        }
        .with_container(container)
    }

    /// Validates `configuration_cache_key` behavior for equal and differing
    /// content.
    ///
    /// Assertions:
    /// - Separately built equal values share a key.
    /// - A different container changes the key.
    /// - The key does not contain the plain-text key.
    #[test]
    fn test_key_tracks_content() {
        let a = configuration_cache_key(&config("c1")).unwrap();
        let b = configuration_cache_key(&config("c1")).unwrap();
        let c = configuration_cache_key(&config("c2")).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(!a.contains("key1"));
    }

    #[test]
    fn test_context_cache_key_format() {
        assert_eq!(context_cache_key("abc", "none"), "abc/none");
    }
}
