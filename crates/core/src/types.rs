use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single persisted job posting, unique by `source_url`.
///
/// `content_hash` is always `sha256("{title}|{company}|{description}")` —
/// it is recomputed on every upsert and never trusted from an untrusted
/// caller (see `career_crawler_storage::compute_content_hash`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: Option<i64>,
    pub source_site: String,
    pub source_url: String,
    pub search_keyword: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub description: Option<String>,
    pub posted_date: Option<NaiveDate>,
    pub content_hash: String,
    pub crawled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A job record as produced upstream, before it has a content hash or
/// timestamps. This is what Fetcher/ExtractionCache and the job-board
/// adapter both produce; `career_crawler_storage::upsert` stamps the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedJob {
    pub source_site: String,
    pub source_url: String,
    pub search_keyword: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub description: Option<String>,
    pub posted_date: Option<NaiveDate>,
}

/// One of the three terminal-or-running states of a `CrawlRun`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Per-(keyword, source) execution record.
#[derive(Debug, Clone)]
pub struct CrawlRun {
    pub id: i64,
    pub keyword: String,
    pub source: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub new_count: i64,
    pub updated_count: i64,
    pub error_count: i64,
    pub error_message: Option<String>,
}

/// The six selector roles a cached extraction plan may carry.
///
/// `job_list_selector` is the only mandatory one; every other field is an
/// `Option` because the LLM is free to omit what it didn't find.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectorPlan {
    pub job_list_selector: String,
    pub title_selector: Option<String>,
    pub company_selector: Option<String>,
    pub location_selector: Option<String>,
    pub url_selector: Option<String>,
    pub salary_selector: Option<String>,
}

/// Batch upsert outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertCounts {
    pub new: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub error: u32,
}

impl UpsertCounts {
    pub fn merge(&mut self, other: UpsertCounts) {
        self.new += other.new;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.error += other.error;
    }
}

/// Outcome of a single fetch attempt, the closed variant set that both
/// `AdaptiveDelay` and `CircuitBreaker` are notified with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    RateLimited(u16),
    ClientError,
    ServerError,
    TransportFailure,
}

/// One company career page to crawl: a URL template plus a rendering mode.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyPageTarget {
    pub url: String,
    #[serde(default)]
    pub js_render: bool,
}

/// Browser-like headers plus a user agent, produced by the fingerprint crate.
pub type HeaderMap = HashMap<String, String>;

/// A common desktop viewport size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}
