//! Per-service client options.
//!
//! Factories compare options by instance, not by value: two equal bags are
//! still two cache entries. None of these types implement `PartialEq`.

use std::time::Duration;

/// Retry and timeout settings shared by every service client.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(800),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlobClientOptions {
    pub transport: TransportOptions,
    /// Service API version sent with every request, when pinned.
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TableClientOptions {
    pub transport: TransportOptions,
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CosmosClientOptions {
    pub transport: TransportOptions,
    /// Preferred region for reads, e.g. `"West Europe"`.
    pub application_region: Option<String>,
    pub allow_bulk_execution: bool,
}
