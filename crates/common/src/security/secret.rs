//! Secret value wrapper with automatic memory zeroization.
//!
//! Connection strings and account keys pulled from a vault pass through
//! [`SecretValue`] on their way into a client handle. The wrapper zeroes its
//! buffer on drop and never prints its contents.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret string that zeroes memory on drop and redacts itself when
/// formatted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue {
    inner: String,
}

impl SecretValue {
    /// Wrap a secret.
    pub fn new(value: impl Into<String>) -> Self {
        Self { inner: value.into() }
    }

    /// Expose the inner value.
    ///
    /// The exposed slice must not be stored or logged.
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Compare with another secret in constant time
    pub fn constant_time_eq(&self, other: &SecretValue) -> bool {
        constant_time_eq(self.inner.as_bytes(), other.inner.as_bytes())
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue(***)")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}
