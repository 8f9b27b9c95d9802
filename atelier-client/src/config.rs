//! Client configuration

use std::path::PathBuf;

/// Client configuration for connecting to the catalog API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL (e.g., "http://localhost:8000")
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Namespace directory for local persistence (guest cart, tokens,
    /// cached profile)
    pub storage_dir: PathBuf,
}

impl ClientConfig {
    /// Create a new configuration with defaults (30s timeout, `.atelier`
    /// storage namespace).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: 30,
            storage_dir: PathBuf::from(".atelier"),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the local storage namespace directory.
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Create an HTTP client from this configuration.
    pub fn build_http_client(&self) -> super::HttpClient {
        super::HttpClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000")
    }
}
