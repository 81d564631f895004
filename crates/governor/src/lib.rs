//! Per-domain anti-throttling state: adaptive delay, circuit breaking, and
//! proxy rotation, unified behind a single notification seam so a caller
//! can never update one without the other.

mod circuit;
mod delay;
mod proxy;

use std::time::Duration;

use career_crawler_core::{CrawlError, FetchOutcome, HeaderMap, Settings};

pub use circuit::CircuitBreaker;
pub use delay::AdaptiveDelay;
pub use proxy::ProxyPool;

/// The fetch-path decision and state engine for one crawl process.
///
/// Composes the three independent anti-throttling mechanisms described in
/// SPEC_FULL.md §4.B–D. `observe` is the only way callers report a fetch
/// result back in, so delay backoff and circuit-breaker bookkeeping can
/// never drift out of sync with each other.
pub struct DomainGovernor {
    pub delay: AdaptiveDelay,
    pub circuit: CircuitBreaker,
    pub proxies: ProxyPool,
}

impl DomainGovernor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            delay: AdaptiveDelay::new(settings.min_delay, settings.max_delay),
            circuit: CircuitBreaker::new(
                settings.circuit_breaker_threshold,
                Duration::from_secs_f64(settings.circuit_breaker_cooldown),
            ),
            proxies: ProxyPool::new(
                settings
                    .proxy_url
                    .clone()
                    .into_iter()
                    .collect::<Vec<_>>(),
            ),
        }
    }

    /// Whether the circuit is currently open for `domain` — callers should
    /// skip the request entirely when this is true.
    pub fn is_blocked(&self, domain: &str) -> Result<(), CrawlError> {
        if self.circuit.is_open(domain) {
            return Err(CrawlError::Other(anyhow::anyhow!(
                "circuit open for domain {domain}"
            )));
        }
        Ok(())
    }

    /// Suspend the caller for the domain's current jittered delay.
    pub async fn throttle(&self, domain: &str) {
        self.delay.wait(domain).await;
    }

    /// Single seam for reporting a fetch result: updates delay backoff and
    /// circuit-breaker state together.
    pub fn observe(&self, domain: &str, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Success => {
                self.delay.report_success(domain);
                self.circuit.record_success(domain);
            }
            FetchOutcome::RateLimited(status) => {
                self.delay.report_error(domain, Some(status));
                self.circuit.record_failure(domain);
            }
            FetchOutcome::ClientError => {
                self.delay.report_error(domain, None);
            }
            FetchOutcome::ServerError => {
                self.delay.report_error(domain, None);
                self.circuit.record_failure(domain);
            }
            FetchOutcome::TransportFailure => {
                self.delay.report_error(domain, None);
                self.circuit.record_failure(domain);
            }
        }
    }

    /// Headers to use for the next request to `domain`, minus the proxy
    /// selection, which callers draw separately via `self.proxies`.
    pub fn proxy_for_request(&self) -> Option<String> {
        if self.proxies.enabled() {
            self.proxies.get_next()
        } else {
            None
        }
    }
}

/// Narrow trait over `HeaderMap` construction so the fetcher crate doesn't
/// need a direct dependency on the fingerprint crate's concrete type.
pub trait HeaderSource {
    fn random_headers(&self) -> HeaderMap;
}
