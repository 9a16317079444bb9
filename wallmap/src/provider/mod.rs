//! Basemap tile providers.
//!
//! The [`registry`] maps provider identifiers to URL templates and the
//! environment variable holding their credential. Resolution produces a
//! [`TileSource`], which fetches tiles through any [`HttpClient`].
//!
//! ```ignore
//! use wallmap::provider::{registry, ReqwestClient};
//!
//! let source = registry::resolve("CartoDB.Positron")?;
//! let client = ReqwestClient::with_timeout(Duration::from_secs(30))?;
//! let png = source.fetch(&client, &tile)?;
//! ```

mod http;
pub mod registry;
mod source;

pub use http::{HttpClient, ReqwestClient, USER_AGENT};
pub use registry::{is_known, lookup, resolve, resolve_with, ProviderSpec, PROVIDERS};
pub use source::TileSource;

#[cfg(test)]
pub use http::tests::MockHttpClient;

use thiserror::Error;

/// Errors that can occur resolving providers or fetching tiles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Unknown basemap provider '{0}'")]
    UnknownProvider(String),

    #[error("Provider {provider} requires an API key in ${env_var}")]
    MissingCredential { provider: String, env_var: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Zoom level {0} not supported by provider")]
    UnsupportedZoom(u8),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
