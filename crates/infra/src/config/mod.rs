//! Settings loading
//!
//! Loads factory settings from environment variables or files and turns
//! them into the runtime values the factories and the tracing subscriber
//! take.

pub mod loader;

use storekeeper_common::{init_tracing, CommonResult, LogFormat, RetryDelay};
use storekeeper_domain::StorekeeperSettings;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};

/// The reattempt window described by `settings`.
///
/// # Errors
/// Returns `CommonError::Config` if the bounds are out of order or above
/// the allowed maximum.
pub fn retry_delay(settings: &StorekeeperSettings) -> CommonResult<RetryDelay> {
    RetryDelay::from_millis(settings.retry.min_delay_ms, settings.retry.max_delay_ms)
}

/// Install the tracing subscriber described by `settings`.
///
/// # Errors
/// Returns `CommonError::Config` if the filter directive is invalid.
pub fn init_logging(settings: &StorekeeperSettings) -> CommonResult<()> {
    let format = if settings.logging.json { LogFormat::Json } else { LogFormat::Text };
    init_tracing(&settings.logging.filter, format)
}
