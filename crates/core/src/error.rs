use thiserror::Error;

/// Error taxonomy shared across the fetch, extraction, and storage layers.
///
/// Fetch-path variants never escape the Fetcher as exceptions — they exist
/// so the governor and the orchestrator can log *why* a `None` came back
/// without resorting to string matching.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("rate limited (HTTP {0})")]
    RateLimited(u16),

    #[error("client error (HTTP {0})")]
    HttpClientError(u16),

    #[error("server error (HTTP {0})")]
    HttpServerError(u16),

    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("selector plan produced zero results")]
    SelectorFailure,

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
