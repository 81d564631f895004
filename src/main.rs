use std::sync::Arc;

use anyhow::{Context, Result};
use career_crawler_cache::ExtractionCache;
use career_crawler_core::{AppConfig, Settings};
use career_crawler_fetcher::Fetcher;
use career_crawler_fingerprint::Fingerprint;
use career_crawler_llm::{HttpChatModel, HttpPlanner};
use career_crawler_orchestrator::{CrawlOrchestrator, Scheduler, StubJobBoardSearch};
use career_crawler_storage::Storage;
use tracing::warn;

// mimalloc avoids glibc malloc's memory bloat under the high fan-out of
// concurrent per-domain fetches.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const DEFAULT_CONFIG_PATH: &str = "config/search.yaml";
const DEFAULT_UA_POOL_PATH: &str = "config/user_agents.txt";

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let settings = Settings::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config_str = std::fs::read_to_string(&config_path).unwrap_or_else(|_| {
        warn!(path = %config_path, "search config not found, using embedded default");
        include_str!("../config/search.yaml").to_string()
    });
    let app_config: AppConfig = serde_yaml::from_str(&config_str).context("failed to parse search config")?;

    let ua_path = std::env::var("UA_POOL_PATH").unwrap_or_else(|_| DEFAULT_UA_POOL_PATH.to_string());
    let fingerprint = Arc::new(Fingerprint::load_from_file(&ua_path).unwrap_or_else(|e| {
        warn!(path = %ua_path, error = %e, "UA pool file unavailable, using embedded default");
        Fingerprint::new(
            include_str!("../config/user_agents.txt")
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
        )
    }));

    let storage = Arc::new(
        Storage::new(&settings.database_url)
            .await
            .context("failed to connect to postgres")?,
    );
    storage.run_migrations().await.context("failed to run migrations")?;

    let fetcher = Arc::new(Fetcher::new(&settings, fingerprint));

    let llm_endpoint = std::env::var("LLM_ENDPOINT")
        .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
    let llm_api_key = std::env::var("LLM_API_KEY").unwrap_or_default();
    let chat_model = HttpChatModel::new(llm_endpoint, llm_api_key, settings.llm_model_key.clone());
    let planner = Arc::new(HttpPlanner::new(chat_model));

    let cache = Arc::new(ExtractionCache::new(storage.clone(), planner));
    let job_board = Arc::new(StubJobBoardSearch::empty());

    let orchestrator = Arc::new(CrawlOrchestrator::new(
        app_config.clone(),
        &settings,
        fetcher,
        cache,
        storage,
        job_board,
    ));

    let scheduler = Scheduler::new(
        orchestrator,
        app_config.schedule.cron.clone(),
        app_config.schedule.timezone.clone(),
    );
    scheduler.run().await
}
