//! Factory settings.
//!
//! Loaded by `storekeeper_infra::config` from the environment or a settings
//! file. Every field has a default so partial files bind.

use serde::{Deserialize, Serialize};

/// Default lower bound of the reattempt delay window, in milliseconds.
pub const DEFAULT_RETRY_MIN_DELAY_MS: u64 = 150;

/// Default upper bound of the reattempt delay window, in milliseconds.
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 250;

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorekeeperSettings {
    pub retry: RetryDelaySettings,
    pub logging: LoggingSettings,
}

/// Window the one-shot reattempt delay is drawn from after a faulted
/// construction is evicted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryDelaySettings {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryDelaySettings {
    fn default() -> Self {
        Self { min_delay_ms: DEFAULT_RETRY_MIN_DELAY_MS, max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS }
    }
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit one JSON object per event instead of text lines.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: false }
    }
}
