//! Runs the per-domain harvest for a whole batch under a concurrency ceiling.

use crate::core::error::{AppError, Result};
use crate::core::harvester::EmailHarvester;
use crate::core::journal::HarvestJournal;
use crate::core::models::{DomainHarvest, HarvestResult, Strategy};
use crate::utils::domain::Domain;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// Per-domain progress notification, invoked from the coordinator loop.
pub type ProgressCallback<'a> = &'a (dyn Fn(&DomainHarvest) + Send + Sync);

type TaskOutcome = (Domain, std::result::Result<DomainHarvest, tokio::task::JoinError>);

/// Fans a batch of domains out to independent tasks, at most
/// `max_concurrency` at a time, and folds their results into one
/// [`HarvestResult`].
pub struct ScrapeCoordinator {
    harvester: Arc<EmailHarvester>,
    max_concurrency: usize,
}

impl ScrapeCoordinator {
    pub fn new(harvester: Arc<EmailHarvester>, max_concurrency: usize) -> Self {
        Self {
            harvester,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Harvests every domain. The result holds exactly one entry per distinct
    /// input domain; failed domains map to an empty set.
    pub async fn run(&self, domains: &[Domain]) -> Result<HarvestResult> {
        self.run_inner(domains, None, None).await
    }

    /// Like [`run`](Self::run), but skips domains already present in
    /// `journal` and appends each newly completed domain to it.
    pub async fn run_with_journal(
        &self,
        domains: &[Domain],
        journal: &mut HarvestJournal,
    ) -> Result<HarvestResult> {
        self.run_inner(domains, Some(journal), None).await
    }

    /// Full form used by the CLI: optional journal plus a progress hook.
    pub async fn run_with_progress(
        &self,
        domains: &[Domain],
        journal: Option<&mut HarvestJournal>,
        progress: ProgressCallback<'_>,
    ) -> Result<HarvestResult> {
        self.run_inner(domains, journal, Some(progress)).await
    }

    async fn run_inner(
        &self,
        domains: &[Domain],
        mut journal: Option<&mut HarvestJournal>,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<HarvestResult> {
        let unique: BTreeSet<&Domain> = domains.iter().collect();
        if unique.is_empty() {
            return Err(AppError::InsufficientInput(
                "No domains to harvest.".to_string(),
            ));
        }

        let start_time = Instant::now();
        let mut results = HarvestResult::new();

        let mut pending = Vec::with_capacity(unique.len());
        for domain in unique {
            let replayed = journal.as_ref().and_then(|j| j.replayed().get(domain));
            match replayed {
                Some(emails) => {
                    results.insert(domain.clone(), emails.clone());
                    if let Some(notify) = progress {
                        notify(&DomainHarvest {
                            domain: domain.clone(),
                            emails: emails.clone(),
                            strategy: Strategy::Journaled,
                        });
                    }
                }
                None => pending.push(domain.clone()),
            }
        }
        if !results.is_empty() {
            tracing::info!(target: "coordinator",
                "Resuming: {} domain(s) restored from journal, {} to harvest.",
                results.len(), pending.len()
            );
        }

        let total = pending.len();
        tracing::info!(target: "coordinator",
            "Harvesting {} domain(s) with concurrency {}.", total, self.max_concurrency);

        let mut tasks: FuturesUnordered<BoxFuture<'static, TaskOutcome>> = FuturesUnordered::new();
        let mut completed = 0usize;

        for domain in pending {
            while tasks.len() >= self.max_concurrency {
                if let Some((finished, outcome)) = tasks.next().await {
                    completed += 1;
                    self.publish(&mut results, &mut journal, progress, finished, outcome, completed, total);
                } else {
                    tracing::warn!(target: "coordinator", "Task queue unexpectedly empty while limiting concurrency.");
                    break;
                }
            }

            let harvester = Arc::clone(&self.harvester);
            let task_domain = domain.clone();
            let handle = tokio::spawn(async move { harvester.harvest_domain(&task_domain).await });
            tasks.push(async move { (domain, handle.await) }.boxed());
        }

        while let Some((finished, outcome)) = tasks.next().await {
            completed += 1;
            self.publish(&mut results, &mut journal, progress, finished, outcome, completed, total);
        }

        tracing::info!(target: "coordinator",
            "Harvest finished in {:.2?}: {} of {} domain(s) yielded emails.",
            start_time.elapsed(), results.domains_with_emails(), results.len()
        );
        Ok(results)
    }

    #[allow(clippy::too_many_arguments)]
    fn publish(
        &self,
        results: &mut HarvestResult,
        journal: &mut Option<&mut HarvestJournal>,
        progress: Option<ProgressCallback<'_>>,
        domain: Domain,
        outcome: std::result::Result<DomainHarvest, tokio::task::JoinError>,
        completed: usize,
        total: usize,
    ) {
        let harvest = match outcome {
            Ok(harvest) => harvest,
            Err(e) => {
                let reason = if e.is_panic() { "panicked" } else { "was cancelled" };
                tracing::error!(target: "coordinator",
                    "[{}] Harvest task {}; recording no emails: {}", domain, reason, e);
                DomainHarvest::empty(domain.clone(), Strategy::Failed)
            }
        };

        tracing::debug!(target: "coordinator",
            "[{}/{}] {} -> {} email(s)", completed, total, domain, harvest.emails.len());

        if let Some(j) = journal.as_deref_mut() {
            if let Err(e) = j.append(&domain, &harvest.emails) {
                tracing::error!(target: "coordinator", "[{}] Failed to append to journal: {}", domain, e);
            }
        }
        if let Some(notify) = progress {
            notify(&harvest);
        }
        results.insert(domain, harvest.emails);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::error::FetchError;
    use crate::core::test_support::{CallLog, StubFetcher};
    use crate::fetch::{PageFetcher, RenderedFetcher};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use url::Url;

    fn domains(names: &[&str]) -> Vec<Domain> {
        names.iter().map(|n| Domain::parse(n).unwrap()).collect()
    }

    fn coordinator(light: impl PageFetcher + 'static, concurrency: usize) -> ScrapeCoordinator {
        let config = Arc::new(Config {
            enable_headless: false,
            ..Config::default()
        });
        let harvester = EmailHarvester::with_fetchers(config, Arc::new(light), None);
        ScrapeCoordinator::new(Arc::new(harvester), concurrency)
    }

    #[tokio::test]
    async fn test_one_entry_per_domain_even_when_tasks_panic() {
        let log = Arc::new(CallLog::default());
        let light = StubFetcher::new("light", log)
            .page("http://a.com/", "x@a.com")
            .panicking_on("b.com")
            .failing("http://c.com/", FetchError::Timeout);

        let input = domains(&["a.com", "b.com", "c.com", "a.com"]);
        let results = coordinator(light, 2).run(&input).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(
            results.get(&Domain::parse("a.com").unwrap()).unwrap(),
            &BTreeSet::from(["x@a.com".to_string()])
        );
        assert!(results.get(&Domain::parse("b.com").unwrap()).unwrap().is_empty());
        assert!(results.get(&Domain::parse("c.com").unwrap()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_domain_set_is_fatal() {
        let log = Arc::new(CallLog::default());
        let result = coordinator(StubFetcher::new("light", log), 4).run(&[]).await;
        assert!(matches!(result, Err(AppError::InsufficientInput(_))));
    }

    /// Tracks the peak number of fetches in flight at once.
    struct GaugeFetcher {
        in_flight: AtomicUsize,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PageFetcher for GaugeFetcher {
        async fn fetch(&self, _url: &Url) -> std::result::Result<String, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(String::new())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_ceiling_is_respected() {
        for ceiling in [1usize, 3] {
            let peak = Arc::new(AtomicUsize::new(0));
            let fetcher = GaugeFetcher {
                in_flight: AtomicUsize::new(0),
                peak: peak.clone(),
            };
            let input = domains(&["a.com", "b.com", "c.com", "d.com", "e.com", "f.com"]);

            let results = coordinator(fetcher, ceiling).run(&input).await.unwrap();

            assert_eq!(results.len(), 6);
            assert!(peak.load(Ordering::SeqCst) <= ceiling);
            assert!(peak.load(Ordering::SeqCst) >= 1);
        }
    }

    #[tokio::test]
    async fn test_journal_skips_completed_domains() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        {
            let mut journal = HarvestJournal::open(&path).unwrap();
            journal
                .append(&Domain::parse("a.com").unwrap(), &BTreeSet::from(["old@a.com".to_string()]))
                .unwrap();
        }

        let log = Arc::new(CallLog::default());
        let light = StubFetcher::new("light", log.clone()).page("http://b.com/", "new@b.com");
        let mut journal = HarvestJournal::open(&path).unwrap();

        let results = coordinator(light, 2)
            .run_with_journal(&domains(&["a.com", "b.com"]), &mut journal)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.get(&Domain::parse("a.com").unwrap()).unwrap().contains("old@a.com"));
        assert!(log.entries().iter().all(|e| !e.contains("a.com")));

        let reopened = HarvestJournal::open(&path).unwrap();
        assert_eq!(reopened.replayed().len(), 2);
    }

    #[tokio::test]
    async fn test_progress_reports_every_domain() {
        let log = Arc::new(CallLog::default());
        let light = StubFetcher::new("light", log)
            .page("http://a.com/", "x@a.com")
            .with_delay(Duration::from_millis(1));
        let seen = std::sync::Mutex::new(Vec::new());
        let notify = |h: &DomainHarvest| seen.lock().unwrap().push(h.domain.to_string());

        coordinator(light, 2)
            .run_with_progress(&domains(&["a.com", "b.com", "c.com"]), None, &notify)
            .await
            .unwrap();

        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec!["http://a.com", "http://b.com", "http://c.com"]);
    }

    #[test]
    fn test_zero_ceiling_clamped() {
        let config = Arc::new(Config::default());
        let log = Arc::new(CallLog::default());
        let harvester = EmailHarvester::with_fetchers(
            config,
            Arc::new(StubFetcher::new("light", log)),
            None::<Arc<dyn RenderedFetcher>>,
        );
        assert_eq!(ScrapeCoordinator::new(Arc::new(harvester), 0).max_concurrency(), 1);
    }
}
