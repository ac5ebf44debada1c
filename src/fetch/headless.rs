//! Headless-browser page retrieval through a WebDriver endpoint.

use super::RenderedFetcher;
use crate::core::config::Config;
use crate::core::error::FetchError;

use async_trait::async_trait;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder};
use futures::FutureExt;
use serde_json::map::Map as JsonMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use url::Url;

/// Extra time granted on top of the page-load timeout before the whole
/// navigation is abandoned, for WebDriver servers that never answer.
const NAVIGATION_GRACE: Duration = Duration::from_secs(5);

/// Upper bound on deleting a session once the page is done with.
const SESSION_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Heavy fetcher: every call opens its own browser session and closes it
/// before returning, whatever the outcome.
#[derive(Clone, Debug)]
pub struct HeadlessFetcher {
    webdriver_url: String,
    page_load_timeout: Duration,
}

impl HeadlessFetcher {
    pub fn new(config: &Config) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            page_load_timeout: config.page_load_timeout,
        }
    }

    fn capabilities() -> JsonMap<String, serde_json::Value> {
        let mut caps = JsonMap::new();
        let mut chrome_opts = JsonMap::new();

        let args = vec![
            "--headless=new",
            "--no-sandbox",
            "--disable-gpu",
            "--disable-dev-shm-usage",
            "--window-size=1280,1024",
            "--disable-extensions",
            "--disable-background-networking",
            "--disable-sync",
            "--mute-audio",
            "--ignore-certificate-errors",
            "--log-level=3",
        ];
        chrome_opts.insert("args".to_string(), serde_json::json!(args));

        caps.insert("browserName".to_string(), serde_json::json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!(chrome_opts),
        );
        caps
    }

    /// Opens a WebDriver session.
    async fn open_session(&self) -> Result<Client, FetchError> {
        tracing::debug!(target: "fetch_headless", "Connecting to WebDriver at {}...", self.webdriver_url);

        let mut builder = ClientBuilder::native();
        builder.capabilities(Self::capabilities());

        builder.connect(&self.webdriver_url).await.map_err(|e| {
            tracing::error!(target: "fetch_headless", "Failed to connect to WebDriver at {}: {}", self.webdriver_url, e);
            FetchError::Network(format!("WebDriver session failed: {}", e))
        })
    }

    /// Closes a session, logging rather than propagating any error.
    async fn close_session(client: Client, label: &str) {
        tracing::debug!(target: "fetch_headless", "{} Closing WebDriver session...", label);
        match tokio::time::timeout(SESSION_CLOSE_TIMEOUT, client.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(target: "fetch_headless", "{} Failed to close WebDriver session cleanly: {}", label, e)
            }
            Err(_elapsed) => {
                tracing::warn!(target: "fetch_headless",
                    "{} WebDriver did not confirm session close within {:?}; abandoning it", label, SESSION_CLOSE_TIMEOUT)
            }
        }
    }

    async fn navigate(&self, client: &Client, url: &Url) -> Result<String, FetchError> {
        client
            .update_timeouts(TimeoutConfiguration::new(
                None,
                Some(self.page_load_timeout),
                None,
            ))
            .await
            .map_err(classify_cmd_error)?;
        client.goto(url.as_str()).await.map_err(classify_cmd_error)?;
        client.source().await.map_err(classify_cmd_error)
    }
}

fn classify_cmd_error(e: CmdError) -> FetchError {
    match e {
        CmdError::Standard(ref wd) if matches!(wd.error, ErrorStatus::Timeout) => FetchError::Timeout,
        other => FetchError::Unexpected(other.to_string()),
    }
}

#[async_trait]
impl RenderedFetcher for HeadlessFetcher {
    async fn fetch_rendered(&self, url: &Url) -> Result<String, FetchError> {
        let label = format!("[Headless: {}]", url);
        let deadline = self.page_load_timeout + NAVIGATION_GRACE;

        let client = match tokio::time::timeout(deadline, self.open_session()).await {
            Ok(session) => session?,
            Err(_elapsed) => {
                tracing::warn!(target: "fetch_headless",
                    "{} WebDriver at {} did not open a session within {:?}", label, self.webdriver_url, deadline);
                return Err(FetchError::Timeout);
            }
        };

        let navigation = AssertUnwindSafe(self.navigate(&client, url)).catch_unwind();
        let outcome = match tokio::time::timeout(deadline, navigation).await {
            Ok(Ok(result)) => result,
            Ok(Err(_panic)) => {
                tracing::error!(target: "fetch_headless", "{} Navigation panicked", label);
                Err(FetchError::Unexpected("browser navigation panicked".to_string()))
            }
            Err(_elapsed) => Err(FetchError::Timeout),
        };

        Self::close_session(client, &label).await;

        match &outcome {
            Ok(source) => {
                tracing::debug!(target: "fetch_headless", "{} Rendered {} bytes", label, source.len())
            }
            Err(e) => tracing::warn!(target: "fetch_headless", "{} {}", label, e),
        }
        outcome
    }
}
