//! Page retrieval strategies.
//!
//! The harvester only talks to these traits, so tests (and alternative
//! transports) can swap in their own implementations.

pub mod headless;
pub mod http;

pub use headless::HeadlessFetcher;
pub use http::HttpFetcher;

use crate::core::error::FetchError;
use async_trait::async_trait;
use url::Url;

/// Cheap retrieval: returns the raw response body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Expensive retrieval: returns the page after browser rendering.
#[async_trait]
pub trait RenderedFetcher: Send + Sync {
    async fn fetch_rendered(&self, url: &Url) -> Result<String, FetchError>;
}
