//! Configuration classification.
//!
//! A configuration is reduced once to a [`ConnectionStrategy`]; handle
//! builders dispatch on that value with an exhaustive `match` and never
//! re-inspect the raw fields.

pub mod types;
pub mod validation;

pub use types::{Account, ConfigurationType, ConnectionStrategy};
pub use validation::{classify, strategy_for, validate_named, Classify, ValidationError};
