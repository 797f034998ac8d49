//! Tiered page retrieval.
//!
//! Decision order per URL:
//! 1. host flagged anti-bot and a bypass client is configured -> bypass;
//! 2. host flagged JavaScript-heavy -> headless rendering;
//! 3. otherwise lightweight HTTP, falling back to headless rendering on
//!    failure.
//!
//! That single (3) fallback is the only retry at this layer; the
//! orchestrator's retry wrapper covers extraction, not fetching. Every
//! request first waits on the shared per-host rate limiter.

pub mod browser;
pub mod bypass;
pub mod http;
pub mod rate_limit;

pub use browser::BrowserFetcher;
pub use bypass::BypassFetcher;
pub use http::HttpFetcher;
pub use rate_limit::DomainRateLimiter;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::PageFetcher;
use crate::types::RawFetchResult;

use async_trait::async_trait;

/// Knobs for the fetch tiers.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Timeout for the lightweight HTTP tier.
    pub http_timeout: Duration,

    /// Fixed wait after navigation in the rendering tier.
    pub render_wait: Duration,

    /// Overall deadline for one browser render.
    pub browser_timeout: Duration,

    /// User agent for the HTTP tier.
    pub user_agent: String,

    /// Fixed rendering wait passed to the bypass service, in ms.
    pub bypass_wait_ms: u64,

    /// Geo-targeting country code for the bypass service.
    pub country_code: Option<String>,

    /// Per-host requests per second.
    pub rate_limit: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            render_wait: Duration::from_secs(3),
            browser_timeout: Duration::from_secs(60),
            user_agent: "ExtractionPipeline/1.0".to_string(),
            bypass_wait_ms: 3_000,
            country_code: None,
            rate_limit: 1.0,
        }
    }
}

/// Hosts that need special retrieval handling. Matching is by substring,
/// so `"example.com"` also covers `www.example.com`.
#[derive(Debug, Clone, Default)]
pub struct SiteFlags {
    antibot_hosts: Vec<String>,
    js_heavy_hosts: Vec<String>,
}

impl SiteFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn antibot(mut self, host: impl Into<String>) -> Self {
        self.antibot_hosts.push(host.into());
        self
    }

    pub fn js_heavy(mut self, host: impl Into<String>) -> Self {
        self.js_heavy_hosts.push(host.into());
        self
    }

    pub fn is_antibot(&self, host: &str) -> bool {
        self.antibot_hosts.iter().any(|h| host.contains(h.as_str()))
    }

    pub fn is_js_heavy(&self, host: &str) -> bool {
        self.js_heavy_hosts.iter().any(|h| host.contains(h.as_str()))
    }
}

/// The tiered fetch strategy.
///
/// Tiers are injected as trait objects so tests can script them; the
/// default constructor wires the real HTTP and browser fetchers.
pub struct FetchStrategy {
    http: Arc<dyn PageFetcher>,
    browser: Arc<dyn PageFetcher>,
    bypass: Option<Arc<dyn PageFetcher>>,
    flags: SiteFlags,
    limiter: DomainRateLimiter,
}

impl FetchStrategy {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            http: Arc::new(HttpFetcher::new(
                config.http_timeout,
                config.user_agent.clone(),
            )),
            browser: Arc::new(BrowserFetcher::new(
                config.render_wait,
                config.browser_timeout,
            )),
            bypass: None,
            flags: SiteFlags::default(),
            limiter: DomainRateLimiter::new(config.rate_limit),
        }
    }

    /// Configure the anti-bot bypass tier.
    pub fn with_bypass(mut self, bypass: Arc<dyn PageFetcher>) -> Self {
        self.bypass = Some(bypass);
        self
    }

    pub fn with_flags(mut self, flags: SiteFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Replace the HTTP tier (tests).
    pub fn with_http(mut self, http: Arc<dyn PageFetcher>) -> Self {
        self.http = http;
        self
    }

    /// Replace the rendering tier (tests).
    pub fn with_browser(mut self, browser: Arc<dyn PageFetcher>) -> Self {
        self.browser = browser;
        self
    }

    fn validate(url: &str) -> FetchResult<Url> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(FetchError::DisallowedScheme(other.to_string())),
        }
        if parsed.host_str().is_none() {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
            });
        }
        Ok(parsed)
    }
}

#[async_trait]
impl PageFetcher for FetchStrategy {
    async fn fetch(&self, url: &str) -> FetchResult<RawFetchResult> {
        let parsed = Self::validate(url)?;
        let host = parsed.host_str().unwrap_or_default().to_string();

        self.limiter.acquire(&host).await;

        if self.flags.is_antibot(&host) {
            if let Some(bypass) = &self.bypass {
                debug!(url, host = %host, "host flagged anti-bot, using bypass tier");
                return bypass.fetch(url).await;
            }
            debug!(url, host = %host, "host flagged anti-bot but no bypass configured");
        }

        if self.flags.is_js_heavy(&host) {
            debug!(url, host = %host, "host flagged JS-heavy, using rendering tier");
            return self.browser.fetch(url).await;
        }

        match self.http.fetch(url).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(url, error = %e, "HTTP tier failed, falling back to rendering");
                self.browser.fetch(url).await
            }
        }
    }

    fn name(&self) -> &str {
        "tiered"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use crate::types::FetchMethod;

    fn page(method: FetchMethod) -> RawFetchResult {
        RawFetchResult::new("https://example.com/x", "<html></html>", method)
    }

    fn strategy_with(
        http: MockFetcher,
        browser: MockFetcher,
        flags: SiteFlags,
    ) -> FetchStrategy {
        FetchStrategy::new(&FetchConfig {
            rate_limit: 0.0,
            ..FetchConfig::default()
        })
        .with_http(Arc::new(http))
        .with_browser(Arc::new(browser))
        .with_flags(flags)
    }

    #[tokio::test]
    async fn rejects_invalid_urls_and_schemes() {
        let strategy = strategy_with(MockFetcher::new(), MockFetcher::new(), SiteFlags::new());
        assert!(matches!(
            strategy.fetch("not a url").await,
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            strategy.fetch("file:///etc/passwd").await,
            Err(FetchError::DisallowedScheme(_))
        ));
    }

    #[tokio::test]
    async fn http_failure_falls_back_to_rendering() {
        let http = MockFetcher::new().failing_for("https://example.com/x");
        let browser =
            MockFetcher::new().with_page("https://example.com/x", page(FetchMethod::Browser));
        let strategy = strategy_with(http, browser, SiteFlags::new());

        let result = strategy.fetch("https://example.com/x").await.unwrap();
        assert_eq!(result.method, FetchMethod::Browser);
    }

    #[tokio::test]
    async fn both_tiers_failing_surfaces_the_error() {
        let http = MockFetcher::new().failing_for("https://example.com/x");
        let browser = MockFetcher::new().failing_for("https://example.com/x");
        let strategy = strategy_with(http, browser, SiteFlags::new());

        assert!(strategy.fetch("https://example.com/x").await.is_err());
    }

    #[tokio::test]
    async fn js_heavy_hosts_skip_the_http_tier() {
        let http = MockFetcher::new().with_page("https://spa.example.com/x", page(FetchMethod::Http));
        let browser =
            MockFetcher::new().with_page("https://spa.example.com/x", page(FetchMethod::Browser));
        let strategy = strategy_with(
            http,
            browser,
            SiteFlags::new().js_heavy("spa.example.com"),
        );

        let result = strategy.fetch("https://spa.example.com/x").await.unwrap();
        assert_eq!(result.method, FetchMethod::Browser);
    }

    #[tokio::test]
    async fn antibot_hosts_use_bypass_when_configured() {
        let bypass = MockFetcher::new()
            .with_page("https://guarded.example.com/x", page(FetchMethod::Bypass));
        let strategy = strategy_with(
            MockFetcher::new().failing_for("https://guarded.example.com/x"),
            MockFetcher::new().failing_for("https://guarded.example.com/x"),
            SiteFlags::new().antibot("guarded.example.com"),
        )
        .with_bypass(Arc::new(bypass));

        let result = strategy.fetch("https://guarded.example.com/x").await.unwrap();
        assert_eq!(result.method, FetchMethod::Bypass);
    }

    #[tokio::test]
    async fn antibot_without_bypass_degrades_to_normal_tiers() {
        let http = MockFetcher::new()
            .with_page("https://guarded.example.com/x", page(FetchMethod::Http));
        let strategy = strategy_with(
            http,
            MockFetcher::new(),
            SiteFlags::new().antibot("guarded.example.com"),
        );

        let result = strategy.fetch("https://guarded.example.com/x").await.unwrap();
        assert_eq!(result.method, FetchMethod::Http);
    }
}
