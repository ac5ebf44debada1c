//! Stub fetchers shared by unit tests.

use crate::core::error::FetchError;
use crate::fetch::{PageFetcher, RenderedFetcher};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Ordered record of every fetch made through the stubs.
#[derive(Default)]
pub(crate) struct CallLog(Mutex<Vec<String>>);

impl CallLog {
    pub(crate) fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Serves canned responses by URL; unknown URLs fail with `default_error`.
pub(crate) struct StubFetcher {
    tag: &'static str,
    pages: HashMap<String, Result<String, FetchError>>,
    default_error: FetchError,
    panic_on: Option<String>,
    delay: Duration,
    log: Arc<CallLog>,
}

impl StubFetcher {
    pub(crate) fn new(tag: &'static str, log: Arc<CallLog>) -> Self {
        Self {
            tag,
            pages: HashMap::new(),
            default_error: FetchError::Network("no route".into()),
            panic_on: None,
            delay: Duration::ZERO,
            log,
        }
    }

    pub(crate) fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub(crate) fn failing(mut self, url: &str, error: FetchError) -> Self {
        self.pages.insert(url.to_string(), Err(error));
        self
    }

    /// Panics when any URL containing `needle` is fetched.
    pub(crate) fn panicking_on(mut self, needle: &str) -> Self {
        self.panic_on = Some(needle.to_string());
        self
    }

    /// Sleeps before answering each request.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn respond(&self, url: &Url) -> Result<String, FetchError> {
        self.log.push(format!("{} {}", self.tag, url));
        if let Some(needle) = &self.panic_on {
            if url.as_str().contains(needle.as_str()) {
                panic!("stub fetcher asked to panic on {}", url);
            }
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.pages
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| Err(self.default_error.clone()))
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.respond(url).await
    }
}

#[async_trait]
impl RenderedFetcher for StubFetcher {
    async fn fetch_rendered(&self, url: &Url) -> Result<String, FetchError> {
        self.respond(url).await
    }
}
