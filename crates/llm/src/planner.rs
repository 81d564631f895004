use async_trait::async_trait;
use career_crawler_core::{domain_of, NormalizedJob, SelectorPlan};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::clean::clean_html_default;

pub const EXTRACTION_SYSTEM_PROMPT: &str = "\
You are a web scraping assistant that extracts job posting data from HTML content.

Given the HTML of a career/jobs page, extract ALL job postings visible on the page.

For each job posting, extract:
- title: Job title
- company: Company name
- location: Job location (city, state, remote, etc.)
- salary_range: Salary information if available (null if not shown)
- description: Brief job description or snippet
- job_url: Direct link to the job posting (full URL)
- posted_date: Date posted if available (YYYY-MM-DD format, null if not shown)

Also identify the CSS selectors that can be used to extract these fields for future crawls:
- job_list_selector: CSS selector for the list of job cards/items
- title_selector: CSS selector for job title within a card
- company_selector: CSS selector for company name within a card
- location_selector: CSS selector for location within a card
- url_selector: CSS selector for the link element within a card
- salary_selector: CSS selector for salary info within a card (null if not applicable)

Return your response as a JSON object with two keys:
1. \"jobs\": array of job objects
2. \"selectors\": object with the CSS selector mappings listed above

If no jobs are found, return {\"jobs\": [], \"selectors\": null}.
Respond ONLY with valid JSON, no markdown formatting.";

/// What `Planner::plan` returns: normalized jobs plus an optional selector
/// plan the caller can cache for future crawls of the same page layout.
#[derive(Debug, Clone, Default)]
pub struct PlannerOutput {
    pub jobs: Vec<NormalizedJob>,
    pub selectors: Option<SelectorPlan>,
}

/// A capability that turns cleaned HTML into job postings and (optionally)
/// a reusable selector plan. The only collaborator the orchestration layer
/// injects rather than constructs directly — exercised in tests with an
/// in-memory stub, never a real provider.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, cleaned_html: &str, url: &str, keyword: &str) -> PlannerOutput;
}

#[derive(Deserialize)]
struct RawJob {
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    salary_range: Option<String>,
    description: Option<String>,
    job_url: Option<String>,
    #[serde(default)]
    posted_date: Option<String>,
}

#[derive(Deserialize)]
struct RawSelectors {
    job_list_selector: Option<String>,
    title_selector: Option<String>,
    company_selector: Option<String>,
    location_selector: Option<String>,
    url_selector: Option<String>,
    salary_selector: Option<String>,
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    jobs: Vec<RawJob>,
    selectors: Option<RawSelectors>,
}

/// A single chat message in the `invoke(messages) -> {content: string}`
/// contract the underlying model-gateway client speaks.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Anything capable of the one synchronous LLM call the prompt contract
/// needs. Kept separate from `Planner` so a caller can swap transports
/// (HTTP gateway, local model, test stub) without touching the
/// prompt/post-processing logic in `HttpPlanner`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;
}

/// The concrete `Planner`: builds the prompt, calls the injected
/// `ChatModel`, and post-processes the JSON response per §4.H.
pub struct HttpPlanner<M: ChatModel> {
    model: M,
}

impl<M: ChatModel> HttpPlanner<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M: ChatModel> Planner for HttpPlanner<M> {
    async fn plan(&self, cleaned_html: &str, url: &str, keyword: &str) -> PlannerOutput {
        let cleaned = clean_html_default(cleaned_html);
        let messages = vec![
            ChatMessage {
                role: "system",
                content: EXTRACTION_SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: format!("URL: {url}\nSearch keyword: {keyword}\n\nHTML:\n{cleaned}"),
            },
        ];

        let content = match self.model.invoke(&messages).await {
            Ok(content) => content,
            Err(e) => {
                error!(url, error = %e, "LLM invocation failed");
                return PlannerOutput::default();
            }
        };

        parse_planner_response(&content, url, keyword)
    }
}

fn parse_planner_response(content: &str, page_url: &str, keyword: &str) -> PlannerOutput {
    let parsed: RawResponse = match serde_json::from_str(content) {
        Ok(p) => p,
        Err(e) => {
            warn!(page_url, error = %e, "LLM returned invalid JSON");
            return PlannerOutput::default();
        }
    };

    let source_site = domain_of(page_url);
    let jobs = parsed
        .jobs
        .into_iter()
        .filter_map(|job| normalize_job(job, &source_site, keyword))
        .collect::<Vec<_>>();

    let selectors = parsed.selectors.map(|s| SelectorPlan {
        job_list_selector: s.job_list_selector.unwrap_or_default(),
        title_selector: s.title_selector,
        company_selector: s.company_selector,
        location_selector: s.location_selector,
        url_selector: s.url_selector,
        salary_selector: s.salary_selector,
    });

    info!(page_url, jobs = jobs.len(), "LLM extraction complete");
    PlannerOutput { jobs, selectors }
}

fn normalize_job(job: RawJob, source_site: &str, keyword: &str) -> Option<NormalizedJob> {
    let source_url = job.job_url?;
    if source_url.is_empty() {
        return None;
    }

    Some(NormalizedJob {
        source_site: source_site.to_string(),
        source_url,
        search_keyword: keyword.to_string(),
        title: job.title.unwrap_or_default(),
        company: job.company.unwrap_or_default(),
        location: job.location,
        salary_range: job.salary_range,
        description: job.description,
        posted_date: job
            .posted_date
            .and_then(|d| chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubModel(&'static str);

    #[async_trait]
    impl ChatModel for StubModel {
        async fn invoke(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn parses_jobs_and_selectors() {
        let response = r#"{"jobs": [{"title": "Engineer", "company": "Acme", "job_url": "https://acme.example/1"}], "selectors": {"job_list_selector": ".card"}}"#;
        let planner = HttpPlanner::new(StubModel(response));
        let output = planner.plan("<html></html>", "https://acme.example/careers", "engineer").await;
        assert_eq!(output.jobs.len(), 1);
        assert_eq!(output.jobs[0].source_url, "https://acme.example/1");
        assert_eq!(output.jobs[0].source_site, "acme.example");
        assert_eq!(output.jobs[0].search_keyword, "engineer");
        assert_eq!(output.selectors.unwrap().job_list_selector, ".card");
    }

    #[tokio::test]
    async fn drops_jobs_with_empty_job_url() {
        let response = r#"{"jobs": [{"title": "Engineer", "job_url": ""}], "selectors": null}"#;
        let planner = HttpPlanner::new(StubModel(response));
        let output = planner.plan("<html></html>", "https://acme.example/careers", "engineer").await;
        assert!(output.jobs.is_empty());
    }

    #[tokio::test]
    async fn invalid_json_returns_empty_output() {
        let planner = HttpPlanner::new(StubModel("not json"));
        let output = planner.plan("<html></html>", "https://acme.example/careers", "engineer").await;
        assert!(output.jobs.is_empty());
        assert!(output.selectors.is_none());
    }

    #[tokio::test]
    async fn no_jobs_found_is_a_valid_empty_response() {
        let response = r#"{"jobs": [], "selectors": null}"#;
        let planner = HttpPlanner::new(StubModel(response));
        let output = planner.plan("<html></html>", "https://acme.example/careers", "engineer").await;
        assert!(output.jobs.is_empty());
        assert!(output.selectors.is_none());
    }
}
