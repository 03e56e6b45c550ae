//! Tracing subscriber installation.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{CommonError, CommonResult};

/// Output format for the stdout layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence; `default_directive` applies when it is unset
/// or unparsable. A subscriber that is already installed is left in place and
/// reported as success, so embedding processes and tests can call this more
/// than once.
///
/// # Errors
/// Returns `CommonError::Config` if `default_directive` is not a valid filter.
pub fn init_tracing(default_directive: &str, format: LogFormat) -> CommonResult<()> {
    let fallback = EnvFilter::try_new(default_directive).map_err(|e| {
        CommonError::config_field("logging.filter", format!("invalid filter directive: {e}"))
    })?;
    let filter = EnvFilter::try_from_default_env().unwrap_or(fallback);

    let layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .json()
            .with_filter(filter)
            .boxed(),
        LogFormat::Text => {
            tracing_subscriber::fmt::layer().with_target(true).with_filter(filter).boxed()
        }
    };

    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
