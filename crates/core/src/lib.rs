pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, Settings};
pub use error::CrawlError;
pub use types::*;

/// Extract the host component of a URL's authority — the `domain` key
/// used throughout the governor, cache, and fetcher layers.
///
/// Falls back to the input string itself when it doesn't parse as a URL,
/// so callers can pass an already-bare host without special-casing it.
pub fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| url.to_string())
}
