//! Caching context factories.
//!
//! A context is a ready-to-use storage handle. Factories memoize handle
//! construction per configuration content and options instance, build each
//! handle at most once per cache generation, and rebuild after a failure.

pub mod construction;
pub mod factory;
pub mod key;
pub mod options;
pub mod two_level;

pub use construction::{ConstructionCache, SharedConstruction};
pub use factory::{CachedContext, CachingContextFactory, Constructed, ContextBuilder};
pub use key::{configuration_cache_key, context_cache_key};
pub use options::{ConnectionOptionsRegistry, NO_OPTIONS_KEY};
pub use two_level::{TwoLevelCachingContextFactory, TwoLevelContextBuilder};
