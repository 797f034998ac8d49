use serde::Serialize;

/// Tunable parameters for a scrape request.
///
/// Maps one-to-one onto ScrapingBee query parameters. Defaults match the
/// documented API defaults: no JS rendering wait, standard proxies.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeParams {
    /// Render the page in a headless browser before returning HTML.
    pub render_js: bool,

    /// Fixed wait after navigation, in milliseconds (JS rendering only).
    pub wait_ms: u64,

    /// Route through the premium (residential) proxy pool.
    pub premium_proxy: bool,

    /// Two-letter country code for geo-targeted proxying.
    pub country_code: Option<String>,
}

impl Default for ScrapeParams {
    fn default() -> Self {
        Self {
            render_js: false,
            wait_ms: 0,
            premium_proxy: false,
            country_code: None,
        }
    }
}

impl ScrapeParams {
    /// Parameters suited to anti-bot protected pages: JS rendering with a
    /// fixed wait, premium proxies, optional geo-targeting.
    pub fn anti_bot(wait_ms: u64, country_code: Option<String>) -> Self {
        Self {
            render_js: true,
            wait_ms,
            premium_proxy: true,
            country_code,
        }
    }
}

/// A completed scrape.
#[derive(Debug, Clone)]
pub struct ScrapeResponse {
    /// Rendered (or raw) HTML of the target page.
    pub html: String,

    /// HTTP status the target returned, as reported by the API.
    pub status: u16,

    /// Final URL after redirects, when the API reports one.
    pub resolved_url: Option<String>,
}
