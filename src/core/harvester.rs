use crate::core::config::Config;
use crate::core::error::{FetchError, Result};
use crate::core::models::{DomainHarvest, Strategy};
use crate::fetch::{HeadlessFetcher, HttpFetcher, PageFetcher, RenderedFetcher};
use crate::utils::domain::Domain;
use crate::utils::extract::extract_emails;

use futures::FutureExt;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Resolves the email addresses of a single domain by escalating through
/// progressively more expensive fetch strategies.
///
/// The order is fixed: domain root with the lightweight fetcher, then every
/// contact path with the lightweight fetcher, and only then the same paths
/// with the headless fetcher. The first non-empty extraction wins.
#[derive(Clone)]
pub struct EmailHarvester {
    config: Arc<Config>,
    light: Arc<dyn PageFetcher>,
    heavy: Option<Arc<dyn RenderedFetcher>>,
}

impl EmailHarvester {
    /// Creates a harvester backed by the real HTTP and WebDriver fetchers.
    /// The headless fetcher is omitted when it is disabled in `config`.
    pub(crate) async fn new(config: Arc<Config>) -> Result<Self> {
        tracing::debug!("Initializing EmailHarvester components...");
        let light: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&config)?);
        let heavy: Option<Arc<dyn RenderedFetcher>> = if config.enable_headless {
            tracing::debug!("Headless fallback enabled via {}", config.webdriver_url);
            Some(Arc::new(HeadlessFetcher::new(&config)))
        } else {
            tracing::info!("Headless fallback disabled; contact paths will only be fetched over plain HTTP.");
            None
        };
        Ok(Self::with_fetchers(config, light, heavy))
    }

    /// Creates a harvester from explicit fetchers.
    pub fn with_fetchers(
        config: Arc<Config>,
        light: Arc<dyn PageFetcher>,
        heavy: Option<Arc<dyn RenderedFetcher>>,
    ) -> Self {
        Self {
            config,
            light,
            heavy,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the strategy ladder for `domain`. Fetch failures never abort the
    /// ladder; they count as an attempt that found nothing.
    pub async fn harvest_domain(&self, domain: &Domain) -> DomainHarvest {
        let start_time = Instant::now();
        tracing::debug!(target: "harvest_task", "[{}] Starting harvest.", domain);

        let harvest = self.run_strategies(domain).await;

        if harvest.emails.is_empty() {
            tracing::info!(target: "harvest_task",
                "[{}] No emails found ({:.2?}).", domain, start_time.elapsed());
        } else {
            tracing::info!(target: "harvest_task",
                "[{}] Found {} email(s) via {} ({:.2?}).",
                domain, harvest.emails.len(), harvest.strategy, start_time.elapsed()
            );
        }
        harvest
    }

    async fn run_strategies(&self, domain: &Domain) -> DomainHarvest {
        // RootLight
        match domain.root_url() {
            Ok(root) => {
                let emails = self.try_light(domain, &root).await;
                if !emails.is_empty() {
                    return self.found(domain, emails, Strategy::RootLight);
                }
            }
            Err(e) => {
                tracing::warn!(target: "harvest_task", "[{}] Cannot build root URL: {}", domain, e);
            }
        }

        let page_urls = self.contact_page_urls(domain);

        // PathsLight
        for (path, url) in &page_urls {
            let emails = self.try_light(domain, url).await;
            if !emails.is_empty() {
                return self.found(domain, emails, Strategy::PathsLight { path: path.clone() });
            }
        }

        // PathsHeavy, only once the cheap strategy is exhausted on every path
        if let Some(heavy) = &self.heavy {
            tracing::debug!(target: "harvest_task",
                "[{}] Plain HTTP found nothing; escalating to headless browser.", domain);
            for (path, url) in &page_urls {
                let emails = self.try_heavy(heavy.as_ref(), domain, url).await;
                if !emails.is_empty() {
                    return self.found(domain, emails, Strategy::PathsHeavy { path: path.clone() });
                }
            }
        }

        DomainHarvest::empty(domain.clone(), Strategy::Exhausted)
    }

    fn contact_page_urls(&self, domain: &Domain) -> Vec<(String, Url)> {
        self.config
            .contact_paths
            .iter()
            .filter_map(|path| match domain.join(path) {
                Ok(url) => Some((path.clone(), url)),
                Err(e) => {
                    tracing::warn!(target: "harvest_task",
                        "[{}] Failed to join contact path {}: {}", domain, path, e);
                    None
                }
            })
            .collect()
    }

    async fn try_light(&self, domain: &Domain, url: &Url) -> BTreeSet<String> {
        tracing::debug!(target: "harvest_task", "[{}] GET {}", domain, url);
        match self.light.fetch(url).await {
            Ok(text) => self.extract(&text),
            Err(e) => {
                log_fetch_failure(domain, url, "light", &e);
                BTreeSet::new()
            }
        }
    }

    async fn try_heavy(
        &self,
        heavy: &dyn RenderedFetcher,
        domain: &Domain,
        url: &Url,
    ) -> BTreeSet<String> {
        tracing::debug!(target: "harvest_task", "[{}] Rendering {}", domain, url);
        let rendered = AssertUnwindSafe(heavy.fetch_rendered(url))
            .catch_unwind()
            .await
            .unwrap_or_else(|_panic| {
                Err(FetchError::Unexpected("headless fetcher panicked".to_string()))
            });
        match rendered {
            Ok(text) => self.extract(&text),
            Err(e) => {
                log_fetch_failure(domain, url, "headless", &e);
                BTreeSet::new()
            }
        }
    }

    fn extract(&self, text: &str) -> BTreeSet<String> {
        extract_emails(
            text,
            self.config.max_emails,
            &self.config.excluded_sender_domains,
        )
    }

    fn found(&self, domain: &Domain, emails: BTreeSet<String>, strategy: Strategy) -> DomainHarvest {
        DomainHarvest {
            domain: domain.clone(),
            emails,
            strategy,
        }
    }
}

fn log_fetch_failure(domain: &Domain, url: &Url, fetcher: &str, error: &FetchError) {
    match error {
        FetchError::Timeout | FetchError::Network(_) => {
            tracing::warn!(target: "harvest_task",
                "[{}] {} fetch of {} failed ({}): {}", domain, fetcher, url, error.kind(), error);
        }
        FetchError::Unexpected(_) => {
            tracing::error!(target: "harvest_task",
                "[{}] {} fetch of {} failed ({}): {}", domain, fetcher, url, error.kind(), error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{CallLog, StubFetcher};

    fn harvester(light: StubFetcher, heavy: Option<StubFetcher>) -> EmailHarvester {
        EmailHarvester::with_fetchers(
            Arc::new(Config::default()),
            Arc::new(light),
            heavy.map(|h| Arc::new(h) as Arc<dyn RenderedFetcher>),
        )
    }

    fn domain() -> Domain {
        Domain::parse("http://shop.example").unwrap()
    }

    #[tokio::test]
    async fn test_root_hit_stops_immediately() {
        let log = Arc::new(CallLog::default());
        let light = StubFetcher::new("light", log.clone()).page("http://shop.example/", "mail owner@shop.example");
        let heavy = StubFetcher::new("heavy", log.clone());

        let result = harvester(light, Some(heavy)).harvest_domain(&domain()).await;

        assert_eq!(result.strategy, Strategy::RootLight);
        assert_eq!(result.emails, BTreeSet::from(["owner@shop.example".to_string()]));
        assert_eq!(log.entries(), vec!["light http://shop.example/"]);
    }

    #[tokio::test]
    async fn test_light_paths_tried_in_order_until_hit() {
        let log = Arc::new(CallLog::default());
        let light = StubFetcher::new("light", log.clone())
            .page("http://shop.example/", "<html>nothing here</html>")
            .failing("http://shop.example/contact-us", FetchError::Timeout)
            .page("http://shop.example/about-us", "team@shop.example");
        let heavy = StubFetcher::new("heavy", log.clone());

        let result = harvester(light, Some(heavy)).harvest_domain(&domain()).await;

        assert_eq!(result.strategy, Strategy::PathsLight { path: "/about-us".into() });
        assert_eq!(
            log.entries(),
            vec![
                "light http://shop.example/",
                "light http://shop.example/contact-us",
                "light http://shop.example/contact",
                "light http://shop.example/about-us",
            ]
        );
    }

    #[tokio::test]
    async fn test_heavy_only_after_every_light_path_fails() {
        let log = Arc::new(CallLog::default());
        let light = StubFetcher::new("light", log.clone());
        let heavy = StubFetcher::new("heavy", log.clone())
            .failing("http://shop.example/contact-us", FetchError::Unexpected("crashed".into()))
            .page("http://shop.example/contact", "<div>js@shop.example</div>")
            .page("http://shop.example/about", "late@shop.example");

        let result = harvester(light, Some(heavy)).harvest_domain(&domain()).await;

        assert_eq!(result.strategy, Strategy::PathsHeavy { path: "/contact".into() });
        assert_eq!(result.emails, BTreeSet::from(["js@shop.example".to_string()]));
        assert_eq!(
            log.entries(),
            vec![
                "light http://shop.example/",
                "light http://shop.example/contact-us",
                "light http://shop.example/contact",
                "light http://shop.example/about-us",
                "light http://shop.example/about",
                "heavy http://shop.example/contact-us",
                "heavy http://shop.example/contact",
            ]
        );
    }

    #[tokio::test]
    async fn test_heavy_panic_only_costs_that_path() {
        let log = Arc::new(CallLog::default());
        let light = StubFetcher::new("light", log.clone());
        let heavy = StubFetcher::new("heavy", log.clone())
            .panicking_on("/contact-us")
            .page("http://shop.example/contact", "found: js@shop.example");

        let result = harvester(light, Some(heavy)).harvest_domain(&domain()).await;

        assert_eq!(result.strategy, Strategy::PathsHeavy { path: "/contact".into() });
        assert_eq!(result.emails, BTreeSet::from(["js@shop.example".to_string()]));
        assert_eq!(
            log.entries().iter().filter(|e| e.starts_with("heavy")).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_exhausted_without_heavy_fetcher() {
        let log = Arc::new(CallLog::default());
        let light = StubFetcher::new("light", log.clone())
            .page("http://shop.example/", "errors go to bug@sentry.io, logo@2x.png");

        let result = harvester(light, None).harvest_domain(&domain()).await;

        assert_eq!(result.strategy, Strategy::Exhausted);
        assert!(result.emails.is_empty());
        assert_eq!(log.entries().len(), 5);
    }
}
