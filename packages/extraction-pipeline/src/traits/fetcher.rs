//! Page-fetcher trait implemented by every retrieval tier.

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::types::RawFetchResult;

/// A single way of turning a URL into page content.
///
/// Implementations: `HttpFetcher` (lightweight GET), `BrowserFetcher`
/// (headless rendering), `BypassFetcher` (anti-bot bypass service), and
/// `FetchStrategy`, which composes the three into the tiered decision
/// order. `MockFetcher` in [`crate::testing`] scripts results for tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page.
    async fn fetch(&self, url: &str) -> FetchResult<RawFetchResult>;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}
