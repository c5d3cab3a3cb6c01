//! Client configuration

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Indexer and driver configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// DAS JSON-RPC endpoint
    pub rpc_url: String,
    /// Bound on each indexer fetch
    pub fetch_timeout: Duration,
    /// Interval between polls while waiting for the indexer
    pub poll_interval: Duration,
    /// Bound on the whole wait
    pub poll_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl ClientConfig {
    /// Create a config for local development
    pub fn local() -> Self {
        Self {
            rpc_url: "http://localhost:8899".to_string(),
            fetch_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(20),
            poll_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }

    /// Create a config for mainnet
    pub fn mainnet() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            fetch_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            poll_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the endpoint
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
