use std::time::Duration;

use async_trait::async_trait;
use career_crawler_core::HeaderMap;
use reqwest::header::{HeaderMap as ReqwestHeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::renderer::Renderer;
use crate::RenderOutcome;

/// Plain HTTP fetch via `reqwest`, no JS evaluation. A fresh client is
/// built per request so a per-domain proxy choice can vary call to call —
/// pooling is left to the OS connection cache, same as the original
/// crawler's per-request `httpx.AsyncClient`.
pub struct StaticRenderer {
    timeout: Duration,
}

impl StaticRenderer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn build_client(&self, headers: &HeaderMap, proxy: Option<&str>) -> Option<reqwest::Client> {
        let mut header_map = ReqwestHeaderMap::new();
        for (k, v) in headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(k.as_bytes()), HeaderValue::from_str(v)) {
                header_map.insert(name, value);
            }
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(header_map)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(self.timeout);

        if let Some(proxy_url) = proxy {
            match reqwest::Proxy::all(proxy_url) {
                Ok(p) => builder = builder.proxy(p),
                Err(e) => warn!(proxy_url, error = %e, "invalid proxy url, fetching direct"),
            }
        }

        builder.build().ok()
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn fetch(&self, url: &str, headers: &HeaderMap, proxy: Option<&str>) -> RenderOutcome {
        let Some(client) = self.build_client(headers, proxy) else {
            return RenderOutcome::TransportFailure;
        };

        let response = match client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(url, error = %e, "fetch failed");
                return RenderOutcome::TransportFailure;
            }
        };

        let status = response.status().as_u16();

        if status == 429 || status == 503 {
            warn!(url, status, "rate limited");
            return RenderOutcome::RateLimited(status);
        }
        if status >= 500 {
            warn!(url, status, "server error");
            return RenderOutcome::ServerError(status);
        }
        if status >= 400 {
            warn!(url, status, "client error");
            return RenderOutcome::ClientError(status);
        }

        match response.text().await {
            Ok(body) => RenderOutcome::Success(body),
            Err(e) => {
                warn!(url, error = %e, "failed to read response body");
                RenderOutcome::TransportFailure
            }
        }
    }
}
