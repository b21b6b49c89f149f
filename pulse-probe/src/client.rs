//! HTTP client construction for validation probes

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Probe configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Per-probe timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum concurrent probes in a batch
    pub max_concurrent: usize,
    /// Whether network probes are enabled at all
    pub enabled: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            max_concurrent: 8,
            enabled: true,
        }
    }
}

/// Errors from the probe layer
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to build probe client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// User agents for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:137.0) Gecko/20100101 Firefox/137.0",
];

/// Get a random user agent
pub fn random_user_agent() -> &'static str {
    use rand::Rng;
    let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// Create an HTTP client for existence probes
pub fn create_probe_client(config: &ProbeConfig) -> Result<Client, ProbeError> {
    Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(random_user_agent())
        .redirect(reqwest::redirect::Policy::limited(3))
        .build()
        .map_err(|e| ProbeError::ClientBuild(e.to_string()))
}
