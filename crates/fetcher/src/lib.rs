//! Anti-throttled page fetching.
//!
//! `Fetcher` composes a `DomainGovernor` and a `Fingerprint` pool in front
//! of one of two `Renderer` implementations, selected per-call by the
//! caller's `js_render` flag. Neither renderer ever propagates an error to
//! the caller — a `None` is the sole failure signal, matching the original
//! crawler's "never throws" contract.

mod renderer;
mod static_renderer;

pub use renderer::Renderer;
pub use static_renderer::StaticRenderer;

use std::sync::Arc;
use std::time::Duration;

use career_crawler_core::{domain_of, FetchOutcome, Settings};
use career_crawler_fingerprint::Fingerprint;
use career_crawler_governor::DomainGovernor;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Fetcher {
    governor: Arc<DomainGovernor>,
    fingerprint: Arc<Fingerprint>,
    static_renderer: StaticRenderer,
    js_renderer: Option<Arc<dyn Renderer>>,
}

impl Fetcher {
    pub fn new(settings: &Settings, fingerprint: Arc<Fingerprint>) -> Self {
        Self {
            governor: Arc::new(DomainGovernor::new(settings)),
            fingerprint,
            static_renderer: StaticRenderer::new(REQUEST_TIMEOUT),
            js_renderer: None,
        }
    }

    /// Inject a headless-browser (or any other JS-capable) renderer. Left
    /// unset, `fetch(url, js_render: true)` falls back to the static path
    /// with a warning — a crawl should never hard-fail just because no JS
    /// renderer was wired in.
    pub fn with_js_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.js_renderer = Some(renderer);
        self
    }

    pub fn governor(&self) -> &DomainGovernor {
        &self.governor
    }

    /// Fetch `url`, choosing the static or JS-rendering path. Never returns
    /// an `Err` to the caller — every failure mode collapses to `None`
    /// after the governor has been notified.
    pub async fn fetch(&self, url: &str, js_render: bool) -> Option<String> {
        let domain = domain_of(url);

        if self.governor.is_blocked(&domain).is_err() {
            warn!(domain, "circuit open, skipping fetch");
            return None;
        }

        self.governor.throttle(&domain).await;

        let headers = self.fingerprint.random_headers();
        let proxy = self.governor.proxy_for_request();

        let renderer: &dyn Renderer = match (js_render, &self.js_renderer) {
            (true, Some(r)) => r.as_ref(),
            (true, None) => {
                warn!(domain, "js_render requested but no JS renderer configured, using static fetch");
                &self.static_renderer
            }
            (false, _) => &self.static_renderer,
        };

        let outcome = renderer.fetch(url, &headers, proxy.as_deref()).await;
        self.governor.observe(&domain, outcome.to_fetch_outcome());
        outcome.into_body()
    }
}

/// What a single `Renderer::fetch` call produced, carrying enough detail
/// for the governor's `observe` call without forcing every renderer to
/// know about `FetchOutcome` directly.
pub enum RenderOutcome {
    Success(String),
    RateLimited(u16),
    ClientError(u16),
    ServerError(u16),
    TransportFailure,
}

impl RenderOutcome {
    fn to_fetch_outcome(&self) -> FetchOutcome {
        match self {
            RenderOutcome::Success(_) => FetchOutcome::Success,
            RenderOutcome::RateLimited(code) => FetchOutcome::RateLimited(*code),
            RenderOutcome::ClientError(_) => FetchOutcome::ClientError,
            RenderOutcome::ServerError(_) => FetchOutcome::ServerError,
            RenderOutcome::TransportFailure => FetchOutcome::TransportFailure,
        }
    }

    fn into_body(self) -> Option<String> {
        match self {
            RenderOutcome::Success(body) => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use career_crawler_core::HeaderMap;

    struct StubRenderer(RenderOutcomeKind);

    enum RenderOutcomeKind {
        Ok,
        RateLimited,
    }

    #[async_trait]
    impl Renderer for StubRenderer {
        async fn fetch(&self, _url: &str, _headers: &HeaderMap, _proxy: Option<&str>) -> RenderOutcome {
            match self.0 {
                RenderOutcomeKind::Ok => RenderOutcome::Success("<html></html>".to_string()),
                RenderOutcomeKind::RateLimited => RenderOutcome::RateLimited(429),
            }
        }
    }

    fn fetcher() -> Fetcher {
        let settings = Settings::default();
        let fingerprint = Arc::new(Fingerprint::new(vec!["Mozilla/5.0".to_string()]));
        Fetcher::new(&settings, fingerprint)
    }

    #[tokio::test]
    async fn js_render_without_renderer_falls_back_to_static_and_never_panics() {
        let f = fetcher();
        let result = f.fetch("http://127.0.0.1:9/nonexistent", true).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn injected_js_renderer_is_used_when_requested() {
        let f = fetcher().with_js_renderer(Arc::new(StubRenderer(RenderOutcomeKind::Ok)));
        let result = f.fetch("http://example.com/page", true).await;
        assert_eq!(result.as_deref(), Some("<html></html>"));
    }

    #[tokio::test]
    async fn rate_limited_renderer_trips_backoff() {
        let f = fetcher().with_js_renderer(Arc::new(StubRenderer(RenderOutcomeKind::RateLimited)));
        let result = f.fetch("http://example.com/page", true).await;
        assert!(result.is_none());
        assert!(f.governor().delay.backoff_factor("example.com") > 1.0);
    }
}
