//! Local network reachability probe.
//!
//! Used to tell "the cloud host is down or unknown" apart from "this machine
//! is offline" after a connection-level failure.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::constants::PROBE_TIMEOUT_SECS;

/// Answers whether the local network is reachable at all.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn is_network_available(&self) -> bool;
}

/// Probe that opens a TCP connection to well-known addresses.
#[derive(Debug, Clone)]
pub struct TcpNetworkProbe {
    addresses: Vec<String>,
    timeout: Duration,
}

impl TcpNetworkProbe {
    pub fn new(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            timeout: Duration::from_secs(PROBE_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl NetworkProbe for TcpNetworkProbe {
    async fn is_network_available(&self) -> bool {
        for address in &self.addresses {
            match tokio::time::timeout(self.timeout, TcpStream::connect(address.as_str())).await {
                Ok(Ok(_)) => {
                    tracing::debug!(address = %address, "Network probe succeeded");
                    return true;
                }
                Ok(Err(e)) => {
                    tracing::debug!(address = %address, error = %e, "Network probe failed");
                }
                Err(_) => {
                    tracing::debug!(address = %address, "Network probe timed out");
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reachable_address() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let probe = TcpNetworkProbe::new(vec![addr]);
        assert!(probe.is_network_available().await);
    }

    #[tokio::test]
    async fn test_unreachable_addresses() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let probe = TcpNetworkProbe::new(vec![addr]).with_timeout(Duration::from_millis(500));
        assert!(!probe.is_network_available().await);
        assert!(!TcpNetworkProbe::new(Vec::new()).is_network_available().await);
    }
}
