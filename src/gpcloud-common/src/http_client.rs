//! HTTP client factory for calls to the cloud service.
//!
//! Every client carries the same User-Agent, `tcp_nodelay`, and explicit
//! request and connect timeouts. Nothing here relies on transport defaults.

use reqwest::Client;
use std::time::Duration;

/// User-Agent string for all HTTP requests
pub const USER_AGENT: &str = concat!("gpcloud-login/", env!("CARGO_PKG_VERSION"));

/// Default timeout for a whole request (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for establishing the TCP connection (10 seconds)
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Idle pooled connections are dropped after this, so DNS gets re-resolved.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates an HTTP client with custom request and connect timeouts.
pub fn create_client_with_timeouts(
    timeout: Duration,
    connect_timeout: Duration,
) -> Result<Client, String> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(connect_timeout.min(timeout))
        .tcp_nodelay(true)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(2)
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {e}"))
}
