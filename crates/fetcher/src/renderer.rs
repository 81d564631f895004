use async_trait::async_trait;
use career_crawler_core::HeaderMap;

use crate::RenderOutcome;

/// A page-fetching strategy: static HTTP or JS-rendered. Both share the
/// same shape so `Fetcher` can pick between them per-call without the
/// governor or caller knowing which one ran.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn fetch(&self, url: &str, headers: &HeaderMap, proxy: Option<&str>) -> RenderOutcome;
}
