//! Signature-keyed selector-plan cache (component I) — the piece that turns
//! a repeat visit to a known page layout from an LLM call into a handful of
//! CSS selector matches.
//!
//! `ExtractionCache::extract` is the sole entry point: look up the page's
//! structural signature, try the cached plan, and fall back to the injected
//! `Planner` whenever the cache is empty, stale, or produces nothing the
//! current HTML can verify.

use std::sync::Arc;

use async_trait::async_trait;
use career_crawler_core::{domain_of, CrawlError, NormalizedJob, SelectorPlan};
use career_crawler_llm::Planner;
use career_crawler_parser::{compute_page_signature, extract_with_selectors};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Where cached `SelectorPlan`s live between crawls. A thin seam over
/// `career-crawler-storage::Storage` so this crate doesn't need a direct
/// `sqlx` dependency; the orchestrator wires the real implementation in.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn get_plan(&self, domain: &str, page_signature: &str) -> Result<Option<SelectorPlan>, CrawlError>;
    async fn upsert_plan(&self, domain: &str, page_signature: &str, plan: &SelectorPlan, verified_at: DateTime<Utc>) -> Result<(), CrawlError>;
}

pub struct ExtractionCache<S: PlanStore, P: Planner> {
    store: Arc<S>,
    planner: Arc<P>,
}

impl<S: PlanStore, P: Planner> ExtractionCache<S, P> {
    pub fn new(store: Arc<S>, planner: Arc<P>) -> Self {
        Self { store, planner }
    }

    /// Extract normalized jobs from `html` fetched from `page_url` under
    /// `keyword`, preferring a cached selector plan and falling back to the
    /// LLM planner when the cache can't verify a non-empty extraction.
    pub async fn extract(&self, html: &str, page_url: &str, keyword: &str) -> Vec<NormalizedJob> {
        let domain = domain_of(page_url);
        let signature = compute_page_signature(html);

        let cached = match self.store.get_plan(&domain, &signature).await {
            Ok(plan) => plan,
            Err(e) => {
                debug!(domain, error = %e, "plan store lookup failed, treating as cold path");
                None
            }
        };

        if let Some(plan) = cached {
            let jobs = extract_with_selectors(html, &plan, page_url);
            if !jobs.is_empty() {
                debug!(domain, signature, jobs = jobs.len(), "cache hit");
                return enrich(jobs, &domain, keyword);
            }
            debug!(domain, signature, "cached plan produced zero jobs, falling back to planner");
        }

        let cleaned = html;
        let output = self.planner.plan(cleaned, page_url, keyword).await;

        if let Some(plan) = &output.selectors {
            if let Err(e) = self
                .store
                .upsert_plan(&domain, &signature, plan, Utc::now())
                .await
            {
                debug!(domain, error = %e, "failed to persist refreshed selector plan");
            } else {
                info!(domain, signature, "selector plan refreshed from LLM");
            }
        }

        output.jobs
    }
}

fn enrich(jobs: Vec<NormalizedJob>, domain: &str, keyword: &str) -> Vec<NormalizedJob> {
    jobs.into_iter()
        .map(|mut job| {
            job.source_site = domain.to_string();
            job.search_keyword = keyword.to_string();
            job
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use career_crawler_llm::PlannerOutput;
    use std::sync::Mutex;

    struct InMemoryPlanStore {
        plans: Mutex<std::collections::HashMap<(String, String), SelectorPlan>>,
    }

    impl InMemoryPlanStore {
        fn empty() -> Self {
            Self { plans: Mutex::new(std::collections::HashMap::new()) }
        }

        fn seeded(domain: &str, signature: &str, plan: SelectorPlan) -> Self {
            let s = Self::empty();
            s.plans.lock().unwrap().insert((domain.to_string(), signature.to_string()), plan);
            s
        }
    }

    #[async_trait]
    impl PlanStore for InMemoryPlanStore {
        async fn get_plan(&self, domain: &str, page_signature: &str) -> Result<Option<SelectorPlan>, CrawlError> {
            Ok(self.plans.lock().unwrap().get(&(domain.to_string(), page_signature.to_string())).cloned())
        }

        async fn upsert_plan(&self, domain: &str, page_signature: &str, plan: &SelectorPlan, _verified_at: DateTime<Utc>) -> Result<(), CrawlError> {
            self.plans.lock().unwrap().insert((domain.to_string(), page_signature.to_string()), plan.clone());
            Ok(())
        }
    }

    struct StubPlanner(PlannerOutput);

    #[async_trait]
    impl Planner for StubPlanner {
        async fn plan(&self, _cleaned_html: &str, _url: &str, _keyword: &str) -> PlannerOutput {
            self.0.clone()
        }
    }

    const SAMPLE_HTML: &str = r#"
        <div class="job-card">
            <h2 class="job-title">AI Engineer</h2>
            <span class="job-company">Acme</span>
            <a href="/jobs/1">apply</a>
        </div>
        <div class="job-card">
            <h2 class="job-title">ML Engineer</h2>
            <span class="job-company">Acme</span>
            <a href="/jobs/2">apply</a>
        </div>
    "#;

    fn llm_plan() -> SelectorPlan {
        SelectorPlan {
            job_list_selector: ".job-card".to_string(),
            title_selector: Some(".job-title".to_string()),
            company_selector: Some(".job-company".to_string()),
            location_selector: None,
            url_selector: Some("a".to_string()),
            salary_selector: None,
        }
    }

    #[tokio::test]
    async fn cold_path_then_cache_hit() {
        let store = Arc::new(InMemoryPlanStore::empty());
        let planner = Arc::new(StubPlanner(PlannerOutput {
            jobs: vec![
                NormalizedJob { title: "AI Engineer".into(), company: "Acme".into(), source_url: "https://acme.example/jobs/1".into(), ..Default::default() },
                NormalizedJob { title: "ML Engineer".into(), company: "Acme".into(), source_url: "https://acme.example/jobs/2".into(), ..Default::default() },
            ],
            selectors: Some(llm_plan()),
        }));
        let cache = ExtractionCache::new(store.clone(), planner.clone());

        let first = cache.extract(SAMPLE_HTML, "https://acme.example/careers", "engineer").await;
        assert_eq!(first.len(), 2);
        assert_eq!(first.iter().map(|j| j.title.as_str()).collect::<Vec<_>>(), vec!["AI Engineer", "ML Engineer"]);

        // Second call: same HTML, same signature. Even if the planner were
        // to return something different, the cached selector path wins.
        let second = cache.extract(SAMPLE_HTML, "https://acme.example/careers", "engineer").await;
        assert_eq!(second.len(), 2);
        assert_eq!(second.iter().map(|j| j.title.as_str()).collect::<Vec<_>>(), vec!["AI Engineer", "ML Engineer"]);
    }

    #[tokio::test]
    async fn stale_plan_falls_back_to_planner_and_refreshes_cache() {
        let signature = compute_page_signature(SAMPLE_HTML);
        let stale = SelectorPlan {
            job_list_selector: ".nonexistent-card".to_string(),
            ..Default::default()
        };
        let store = Arc::new(InMemoryPlanStore::seeded("acme.example", &signature, stale));
        let planner = Arc::new(StubPlanner(PlannerOutput {
            jobs: vec![NormalizedJob { title: "AI Engineer".into(), source_url: "https://acme.example/jobs/1".into(), ..Default::default() }],
            selectors: Some(llm_plan()),
        }));
        let cache = ExtractionCache::new(store.clone(), planner);

        let jobs = cache.extract(SAMPLE_HTML, "https://acme.example/careers", "engineer").await;
        assert_eq!(jobs.len(), 1);

        let refreshed = store.get_plan("acme.example", &signature).await.unwrap();
        assert_eq!(refreshed.unwrap().job_list_selector, ".job-card");
    }

    #[tokio::test]
    async fn llm_jobs_returned_even_without_selectors() {
        let store = Arc::new(InMemoryPlanStore::empty());
        let planner = Arc::new(StubPlanner(PlannerOutput {
            jobs: vec![NormalizedJob { title: "AI Engineer".into(), source_url: "https://acme.example/jobs/1".into(), ..Default::default() }],
            selectors: None,
        }));
        let cache = ExtractionCache::new(store.clone(), planner);

        let jobs = cache.extract(SAMPLE_HTML, "https://acme.example/careers", "engineer").await;
        assert_eq!(jobs.len(), 1);
        assert!(store.get_plan("acme.example", &compute_page_signature(SAMPLE_HTML)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn enriches_with_domain_and_keyword() {
        let store = Arc::new(InMemoryPlanStore::empty());
        let planner = Arc::new(StubPlanner(PlannerOutput {
            jobs: vec![NormalizedJob { title: "AI Engineer".into(), source_url: "https://acme.example/jobs/1".into(), ..Default::default() }],
            selectors: None,
        }));
        let cache = ExtractionCache::new(store, planner);

        let jobs = cache.extract(SAMPLE_HTML, "https://acme.example/careers", "engineer").await;
        assert_eq!(jobs[0].source_site, "acme.example");
        assert_eq!(jobs[0].search_keyword, "engineer");
    }
}
