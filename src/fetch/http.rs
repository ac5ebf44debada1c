//! Plain HTTP page retrieval with retries on timeouts.

use super::PageFetcher;
use crate::core::config::Config;
use crate::core::error::{AppError, FetchError, Result};

use async_trait::async_trait;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

/// Lightweight fetcher backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    request_timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Initialization(format!("Failed to build HTTP client: {}", e)))?;
        tracing::debug!("HTTP client initialized.");

        Ok(Self {
            client,
            request_timeout: config.request_timeout,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        })
    }

    /// One GET attempt. The body is returned whatever the status code:
    /// error pages frequently still carry the site footer with its address.
    async fn fetch_once(&self, url: &Url) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(target: "fetch_http", "GET {} returned {}; reading body anyway", url, status);
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<String, FetchError> {
        retry_on_timeout(url.as_str(), self.max_retries, self.retry_delay, || {
            self.fetch_once(url)
        })
        .await
    }
}

/// Runs `attempt` up to `max_attempts` times in total. Only
/// `FetchError::Timeout` is retried, after sleeping `delay`; any other error
/// is returned immediately.
pub(crate) async fn retry_on_timeout<F, Fut>(
    label: &str,
    max_attempts: u32,
    delay: Duration,
    mut attempt: F,
) -> std::result::Result<String, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<String, FetchError>>,
{
    let max_attempts = max_attempts.max(1);
    for n in 1..=max_attempts {
        match attempt().await {
            Ok(body) => return Ok(body),
            Err(FetchError::Timeout) => {
                if n < max_attempts {
                    tracing::warn!(target: "fetch_http",
                        "Timeout fetching {} (attempt {}/{}); retrying in {:.1?}",
                        label, n, max_attempts, delay
                    );
                    sleep(delay).await;
                } else {
                    tracing::warn!(target: "fetch_http",
                        "Timeout fetching {} (attempt {}/{}); giving up",
                        label, n, max_attempts
                    );
                }
            }
            Err(e) => {
                tracing::warn!(target: "fetch_http", "Error fetching {}: {}", label, e);
                return Err(e);
            }
        }
    }
    Err(FetchError::Timeout)
}
