//! Postgres-backed persistence: the deduplicating job-posting upsert
//! (component J), `CrawlRun` lifecycle tracking, and the selector-plan
//! cache table `ExtractionCache` reads and writes through `PlanStore`.

use async_trait::async_trait;
use career_crawler_cache::PlanStore;
use career_crawler_core::{CrawlError, CrawlRun, NormalizedJob, RunStatus, SelectorPlan, UpsertCounts};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

/// `sha256("{title}|{company}|{description}")` as 64 lowercase hex chars.
///
/// A pure function of its three arguments — permuting them (e.g. swapping
/// title and company) changes the hash, since the pipe-joined string is
/// positional, not a bag of fields.
pub fn compute_content_hash(title: &str, company: &str, description: &str) -> String {
    let joined = format!("{title}|{company}|{description}");
    let digest = Sha256::digest(joined.as_bytes());
    format!("{digest:x}")
}

#[derive(Clone)]
pub struct Storage {
    pool: PgPool,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self, CrawlError> {
        Self::with_pool_size(database_url, 10).await
    }

    pub async fn with_pool_size(database_url: &str, max_connections: u32) -> Result<Self, CrawlError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CrawlError::PersistenceFailure(e.to_string()))?;
        info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), CrawlError> {
        sqlx::raw_sql(include_str!("../migrations/001_init.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| CrawlError::PersistenceFailure(e.to_string()))?;
        info!("migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Open a new `running` `CrawlRun` for `(keyword, source)`.
    pub async fn start_run(&self, keyword: &str, source: &str) -> Result<CrawlRun, CrawlError> {
        let row = sqlx::query(
            "INSERT INTO crawl_runs (keyword, source, status, started_at)
             VALUES ($1, $2, 'running', now())
             RETURNING id, started_at",
        )
        .bind(keyword)
        .bind(source)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CrawlError::PersistenceFailure(e.to_string()))?;

        Ok(CrawlRun {
            id: row.get("id"),
            keyword: keyword.to_string(),
            source: source.to_string(),
            status: RunStatus::Running,
            started_at: row.get("started_at"),
            finished_at: None,
            new_count: 0,
            updated_count: 0,
            error_count: 0,
            error_message: None,
        })
    }

    /// Close a `CrawlRun` with a terminal status and final counts.
    pub async fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        counts: UpsertCounts,
        error_message: Option<&str>,
    ) -> Result<(), CrawlError> {
        sqlx::query(
            "UPDATE crawl_runs
             SET status = $2, finished_at = now(), new_count = $3, updated_count = $4,
                 error_count = $5, error_message = $6
             WHERE id = $1",
        )
        .bind(run_id)
        .bind(status.as_str())
        .bind(counts.new as i64)
        .bind(counts.updated as i64)
        .bind(counts.error as i64)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| CrawlError::PersistenceFailure(e.to_string()))?;
        Ok(())
    }

    /// Insert-or-update a single job by `source_url`, returning which of
    /// `new`/`updated`/`unchanged` occurred.
    ///
    /// New-vs-updated is read off `xmax = 0` rather than compared timestamps
    /// (see DESIGN.md open-question resolution) — immune to clock skew and
    /// concurrent writers racing the same `source_url`.
    pub async fn upsert_job(&self, job: &NormalizedJob) -> Result<UpsertOutcome, CrawlError> {
        let description = job.description.clone().unwrap_or_default();
        let content_hash = compute_content_hash(&job.title, &job.company, &description);

        let row = sqlx::query(
            "INSERT INTO job_postings
                (source_site, source_url, search_keyword, title, company, location,
                 salary_range, description, posted_date, content_hash, crawled_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now(), now())
             ON CONFLICT (source_url) DO UPDATE SET
                source_site = EXCLUDED.source_site,
                search_keyword = EXCLUDED.search_keyword,
                title = EXCLUDED.title,
                company = EXCLUDED.company,
                location = EXCLUDED.location,
                salary_range = EXCLUDED.salary_range,
                description = EXCLUDED.description,
                posted_date = EXCLUDED.posted_date,
                content_hash = EXCLUDED.content_hash,
                updated_at = now()
             WHERE job_postings.content_hash IS DISTINCT FROM EXCLUDED.content_hash
             RETURNING (xmax = 0) AS inserted",
        )
        .bind(&job.source_site)
        .bind(&job.source_url)
        .bind(&job.search_keyword)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.salary_range)
        .bind(&job.description)
        .bind(job.posted_date)
        .bind(&content_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CrawlError::PersistenceFailure(e.to_string()))?;

        Ok(match row {
            Some(r) if r.get::<bool, _>("inserted") => UpsertOutcome::New,
            Some(_) => UpsertOutcome::Updated,
            // WHERE clause excluded the row: either content_hash matched
            // (unchanged) or the conflict branch never fired at all.
            None => UpsertOutcome::Unchanged,
        })
    }

    /// Upsert a batch of jobs, aggregating per-row outcomes. A single row's
    /// `PersistenceFailure` increments `error` and the batch continues.
    pub async fn upsert_batch(&self, jobs: &[NormalizedJob]) -> UpsertCounts {
        let mut counts = UpsertCounts::default();
        for job in jobs {
            match self.upsert_job(job).await {
                Ok(UpsertOutcome::New) => counts.new += 1,
                Ok(UpsertOutcome::Updated) => counts.updated += 1,
                Ok(UpsertOutcome::Unchanged) => counts.unchanged += 1,
                Err(e) => {
                    warn!(source_url = %job.source_url, error = %e, "upsert failed");
                    counts.error += 1;
                }
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    New,
    Updated,
    Unchanged,
}

#[async_trait]
impl PlanStore for Storage {
    async fn get_plan(&self, domain: &str, page_signature: &str) -> Result<Option<SelectorPlan>, CrawlError> {
        let row = sqlx::query(
            "SELECT job_list_selector, title_selector, company_selector, location_selector,
                    url_selector, salary_selector
             FROM llm_pattern_cache
             WHERE domain = $1 AND page_signature = $2",
        )
        .bind(domain)
        .bind(page_signature)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CrawlError::PersistenceFailure(e.to_string()))?;

        Ok(row.map(|r| SelectorPlan {
            job_list_selector: r.get("job_list_selector"),
            title_selector: r.get("title_selector"),
            company_selector: r.get("company_selector"),
            location_selector: r.get("location_selector"),
            url_selector: r.get("url_selector"),
            salary_selector: r.get("salary_selector"),
        }))
    }

    async fn upsert_plan(
        &self,
        domain: &str,
        page_signature: &str,
        plan: &SelectorPlan,
        verified_at: DateTime<Utc>,
    ) -> Result<(), CrawlError> {
        sqlx::query(
            "INSERT INTO llm_pattern_cache
                (domain, page_signature, job_list_selector, title_selector, company_selector,
                 location_selector, url_selector, salary_selector, verified_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (domain, page_signature) DO UPDATE SET
                job_list_selector = EXCLUDED.job_list_selector,
                title_selector = EXCLUDED.title_selector,
                company_selector = EXCLUDED.company_selector,
                location_selector = EXCLUDED.location_selector,
                url_selector = EXCLUDED.url_selector,
                salary_selector = EXCLUDED.salary_selector,
                verified_at = EXCLUDED.verified_at",
        )
        .bind(domain)
        .bind(page_signature)
        .bind(&plan.job_list_selector)
        .bind(&plan.title_selector)
        .bind(&plan.company_selector)
        .bind(&plan.location_selector)
        .bind(&plan.url_selector)
        .bind(&plan.salary_selector)
        .bind(verified_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CrawlError::PersistenceFailure(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_positional_not_a_bag_of_fields() {
        let a = compute_content_hash("Engineer", "Acme", "desc");
        let b = compute_content_hash("Acme", "Engineer", "desc");
        assert_ne!(a, b);
    }

    #[test]
    fn content_hash_is_deterministic() {
        let a = compute_content_hash("Engineer", "Acme", "desc");
        let b = compute_content_hash("Engineer", "Acme", "desc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
