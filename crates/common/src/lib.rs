//! Common utilities shared across storekeeper crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: errors, secret values, the reattempt delay window
//! - `observability`: tracing subscriber installation
//! - `runtime`: everything above, as used by the async crates

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod resilience;
#[cfg(feature = "foundation")]
pub mod security;

// Observability tier
// --------------------------------------------------------------
#[cfg(feature = "observability")]
pub mod observability;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "observability")]
pub use observability::{init_tracing, LogFormat};
#[cfg(feature = "foundation")]
pub use resilience::RetryDelay;
#[cfg(feature = "foundation")]
pub use security::SecretValue;
