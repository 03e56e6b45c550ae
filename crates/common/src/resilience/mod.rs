//! Resilience primitives.
//!
//! Storekeeper deliberately avoids a general retry framework. The only
//! recovery it performs is a single delayed reattempt after a cached
//! construction is found faulted, and [`RetryDelay`] supplies that delay.

pub mod jitter;

pub use jitter::RetryDelay;
