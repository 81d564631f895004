//! Crawl orchestration (component K), the job-board data-contract stub
//! (component M), and the cron scheduler wrapper (component N).
//!
//! `CrawlOrchestrator` is the only piece that knows about `AppConfig` — it
//! turns `(keyword, location, target)` triples into governed fetches,
//! cached extractions, and batched upserts, and never lets a failure escape
//! the loop as an exception.

mod jobboard;
mod scheduler;

pub use jobboard::{JobBoardSearch, StubJobBoardSearch};
pub use scheduler::Scheduler;

use std::sync::Arc;

use career_crawler_cache::ExtractionCache;
use career_crawler_core::{domain_of, AppConfig, RunStatus, Settings};
use career_crawler_fetcher::Fetcher;
use career_crawler_llm::Planner;
use career_crawler_storage::Storage;
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tracing::{error, info};
use url::form_urlencoded;

pub struct CrawlOrchestrator<P: Planner> {
    config: AppConfig,
    fetcher: Arc<Fetcher>,
    cache: Arc<ExtractionCache<Storage, P>>,
    storage: Arc<Storage>,
    job_board: Arc<dyn JobBoardSearch>,
    domain_semaphores: DashMap<String, Arc<Semaphore>>,
    max_concurrent_per_domain: usize,
}

impl<P: Planner> CrawlOrchestrator<P> {
    pub fn new(
        config: AppConfig,
        settings: &Settings,
        fetcher: Arc<Fetcher>,
        cache: Arc<ExtractionCache<Storage, P>>,
        storage: Arc<Storage>,
        job_board: Arc<dyn JobBoardSearch>,
    ) -> Self {
        Self {
            config,
            fetcher,
            cache,
            storage,
            job_board,
            domain_semaphores: DashMap::new(),
            max_concurrent_per_domain: settings.max_concurrent_per_domain,
        }
    }

    /// Run every configured search block to completion. Errors within a
    /// single `(keyword, location, target)` crawl are contained to that
    /// run's `CrawlRun` record and never abort the rest of the sweep.
    pub async fn run_full_crawl(&self) {
        for search in &self.config.searches {
            let locations: Vec<String> = if search.locations.is_empty() {
                vec![String::new()]
            } else {
                search.locations.clone()
            };

            for keyword in &search.keywords {
                for location in &locations {
                    for target in &search.company_pages {
                        self.crawl_company_page(keyword, location, target).await;
                    }
                    if !search.job_boards.is_empty() {
                        self.crawl_job_board(keyword, location, &search.job_boards).await;
                    }
                }
            }
        }
    }

    async fn crawl_company_page(
        &self,
        keyword: &str,
        location: &str,
        target: &career_crawler_core::CompanyPageTarget,
    ) {
        let url = substitute_url_template(&target.url, keyword, location);
        let domain = domain_of(&url);
        let semaphore = self.semaphore_for(&domain);
        let _permit = match semaphore.acquire().await {
            Ok(p) => p,
            Err(_) => return,
        };

        let run = match self.storage.start_run(keyword, &domain).await {
            Ok(run) => run,
            Err(e) => {
                error!(keyword, domain, error = %e, "failed to open crawl run, skipping target");
                return;
            }
        };

        let outcome = self.fetch_extract_upsert(&url, keyword, target.js_render).await;

        let (status, counts, error_message) = match outcome {
            Ok(counts) if counts.error == 0 => (RunStatus::Completed, counts, None),
            Ok(counts) => (
                RunStatus::Completed,
                counts,
                Some(format!("{} row(s) failed to persist", counts.error)),
            ),
            Err(e) => (RunStatus::Failed, Default::default(), Some(e.to_string())),
        };

        if let Err(e) = self
            .storage
            .finish_run(run.id, status, counts, error_message.as_deref())
            .await
        {
            error!(run_id = run.id, error = %e, "failed to close crawl run");
        }
    }

    async fn fetch_extract_upsert(
        &self,
        url: &str,
        keyword: &str,
        js_render: bool,
    ) -> anyhow::Result<career_crawler_core::UpsertCounts> {
        let html = self
            .fetcher
            .fetch(url, js_render)
            .await
            .ok_or_else(|| anyhow::anyhow!("fetch returned no body for {url}"))?;

        let jobs = self.cache.extract(&html, url, keyword).await;
        Ok(self.storage.upsert_batch(&jobs).await)
    }

    async fn crawl_job_board(&self, keyword: &str, location: &str, sites: &[String]) {
        const SOURCE: &str = "jobspy";

        let run = match self.storage.start_run(keyword, SOURCE).await {
            Ok(run) => run,
            Err(e) => {
                error!(keyword, error = %e, "failed to open job board crawl run");
                return;
            }
        };

        let jobs = self.job_board.search(keyword, location, sites).await;
        let counts = self.storage.upsert_batch(&jobs).await;
        info!(keyword, location, jobs = jobs.len(), "job board search complete");

        let error_message = (counts.error > 0).then(|| format!("{} row(s) failed to persist", counts.error));
        if let Err(e) = self
            .storage
            .finish_run(run.id, RunStatus::Completed, counts, error_message.as_deref())
            .await
        {
            error!(run_id = run.id, error = %e, "failed to close job board crawl run");
        }
    }

    fn semaphore_for(&self, domain: &str) -> Arc<Semaphore> {
        self.domain_semaphores
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.max_concurrent_per_domain.max(1))))
            .clone()
    }
}

/// Substitute `{keyword}`/`{location}` placeholders, URL-encoding each value
/// (spaces become `+`, commas become `%2C`, matching form-encoding rules).
fn substitute_url_template(template: &str, keyword: &str, location: &str) -> String {
    let keyword_enc: String = form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
    let location_enc: String = form_urlencoded::byte_serialize(location.as_bytes()).collect();
    template
        .replace("{keyword}", &keyword_enc)
        .replace("{location}", &location_enc)
}
