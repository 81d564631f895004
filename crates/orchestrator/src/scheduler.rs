//! Cron-driven trigger wrapping `CrawlOrchestrator::run_full_crawl`
//! (component N) — the "cron scheduler wrapper" the core spec marks out of
//! scope, implemented here as the ambient glue a runnable binary needs.

use std::sync::Arc;

use career_crawler_llm::Planner;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::CrawlOrchestrator;

pub struct Scheduler<P: Planner + 'static> {
    orchestrator: Arc<CrawlOrchestrator<P>>,
    cron: String,
    timezone: String,
}

impl<P: Planner + 'static> Scheduler<P> {
    pub fn new(orchestrator: Arc<CrawlOrchestrator<P>>, cron: String, timezone: String) -> Self {
        Self { orchestrator, cron, timezone }
    }

    /// Install the cron trigger, run one crawl immediately, then idle until
    /// an interrupt signal is received.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(cron = %self.cron, timezone = %self.timezone, "running initial crawl on startup");
        self.orchestrator.run_full_crawl().await;

        let tz: chrono_tz::Tz = self.timezone.parse().unwrap_or_else(|_| {
            warn!(timezone = %self.timezone, "unrecognized timezone, defaulting to UTC");
            chrono_tz::UTC
        });

        let mut sched = JobScheduler::new().await?;
        let orchestrator = self.orchestrator.clone();
        let job = Job::new_async_tz(self.cron.as_str(), tz, move |_uuid, _lock| {
            let orchestrator = orchestrator.clone();
            Box::pin(async move {
                orchestrator.run_full_crawl().await;
            })
        })?;
        sched.add(job).await?;
        sched.start().await?;

        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install signal handler, shutting down anyway");
        }
        info!("interrupt received, shutting down scheduler");
        sched.shutdown().await?;
        Ok(())
    }
}
