//! Surrogate identities for connection options.
//!
//! Options bags have no usable equality, so each live instance is tracked
//! by pointer and given a process-unique id. Entries hold a `Weak`, which
//! keeps the allocation reserved: an address cannot be reused by another
//! instance while its entry exists, and dead entries are pruned on every
//! lookup.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Surrogate used when no options are supplied.
pub const NO_OPTIONS_KEY: &str = "none";

static NEXT_SURROGATE: AtomicU64 = AtomicU64::new(1);

/// Registry of options instances seen by a factory.
pub struct ConnectionOptionsRegistry<O> {
    entries: Mutex<Vec<(Weak<O>, u64)>>,
}

impl<O> ConnectionOptionsRegistry<O> {
    pub fn new() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }

    /// Cache key component for `options`.
    pub fn key_for(&self, options: Option<&Arc<O>>) -> String {
        match options {
            None => NO_OPTIONS_KEY.to_string(),
            Some(options) => self.surrogate_id(options).to_string(),
        }
    }

    /// Surrogate id for this exact instance, assigning one on first sight.
    pub fn surrogate_id(&self, options: &Arc<O>) -> u64 {
        let mut entries = self.entries.lock();
        entries.retain(|(weak, _)| weak.strong_count() > 0);

        let target = Arc::as_ptr(options);
        if let Some((_, id)) = entries.iter().find(|(weak, _)| std::ptr::eq(weak.as_ptr(), target)) {
            return *id;
        }

        let id = NEXT_SURROGATE.fetch_add(1, Ordering::Relaxed);
        entries.push((Arc::downgrade(options), id));
        id
    }

    /// Number of live instances currently tracked.
    pub fn tracked(&self) -> usize {
        let mut entries = self.entries.lock();
        entries.retain(|(weak, _)| weak.strong_count() > 0);
        entries.len()
    }
}

impl<O> Default for ConnectionOptionsRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}
