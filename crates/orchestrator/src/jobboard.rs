//! Data-contract stub for the third-party job-board aggregator (component
//! M). The real aggregator is an external collaborator; this crate only
//! specifies and exercises the shape its output must take.

use async_trait::async_trait;
use career_crawler_core::NormalizedJob;

/// `search(keyword, location, sites)` is the entire contract: an external
/// collaborator turns a keyword/location pair plus a list of board names
/// into already-normalized jobs, bypassing Fetcher and ExtractionCache.
#[async_trait]
pub trait JobBoardSearch: Send + Sync {
    async fn search(&self, keyword: &str, location: &str, sites: &[String]) -> Vec<NormalizedJob>;
}

/// Fixed-response placeholder. The operator swaps this for a real adapter;
/// tests use it to exercise the orchestrator's job-board path without a
/// network dependency.
pub struct StubJobBoardSearch {
    jobs: Vec<NormalizedJob>,
}

impl StubJobBoardSearch {
    pub fn new(jobs: Vec<NormalizedJob>) -> Self {
        Self { jobs }
    }

    pub fn empty() -> Self {
        Self { jobs: Vec::new() }
    }
}

#[async_trait]
impl JobBoardSearch for StubJobBoardSearch {
    async fn search(&self, _keyword: &str, _location: &str, _sites: &[String]) -> Vec<NormalizedJob> {
        self.jobs.clone()
    }
}
