//! Observability setup.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the embedding process through [`init_tracing`].

pub mod logging;

pub use logging::{init_tracing, LogFormat};
