//! HTTP client abstraction for testability

use std::time::Duration;

use tracing::trace;

use super::ProviderError;

/// Trait for synchronous HTTP GET requests.
///
/// Lets the basemap and downloader run against a mock in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the body.
    fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        (**self).get(url)
    }
}

/// Default User-Agent string. Tile servers such as OpenStreetMap reject
/// requests without one.
pub const USER_AGENT: &str = concat!("wallmap/", env!("CARGO_PKG_VERSION"));

/// Real HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client whose requests fail after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Opens a streaming GET response, for large downloads.
    pub fn get_response(&self, url: &str) -> Result<reqwest::blocking::Response, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ProviderError::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::Http(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }
        Ok(response)
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        trace!(url, "GET");
        self.get_response(url)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ProviderError::Http(format!("Failed to read response: {}", e)))
    }
}
