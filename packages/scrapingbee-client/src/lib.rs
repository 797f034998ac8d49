//! Pure ScrapingBee REST API client.
//!
//! A minimal client for the ScrapingBee scraping API. Supports JS rendering,
//! premium (residential) proxies and geo-targeting, which together get
//! through most anti-bot walls.
//!
//! # Example
//!
//! ```rust,ignore
//! use scrapingbee_client::{ScrapeParams, ScrapingBeeClient};
//!
//! let client = ScrapingBeeClient::new("your-api-key".into());
//! let params = ScrapeParams::anti_bot(3000, Some("cr".into()));
//! let page = client.fetch("https://protected.example.com", &params).await?;
//! println!("{} bytes of HTML", page.html.len());
//! ```

pub mod error;
pub mod types;

pub use error::{Result, ScrapingBeeError};
pub use types::{ScrapeParams, ScrapeResponse};

use std::time::Duration;

const BASE_URL: &str = "https://app.scrapingbee.com/api/v1/";

/// Header carrying the target page's original HTTP status.
const ORIGINAL_STATUS_HEADER: &str = "Spb-Initial-Status-Code";

/// Header carrying the final resolved URL after redirects.
const RESOLVED_URL_HEADER: &str = "Spb-Resolved-Url";

pub struct ScrapingBeeClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ScrapingBeeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(90))
                .build()
                .expect("failed to build HTTP client"),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (for proxies or test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch a page through the API.
    ///
    /// Retries once on a transport or API failure before giving up; the
    /// rendering backends are flaky enough that a single retry pays for
    /// itself.
    pub async fn fetch(&self, url: &str, params: &ScrapeParams) -> Result<ScrapeResponse> {
        match self.fetch_once(url, params).await {
            Ok(resp) => Ok(resp),
            Err(first) => {
                tracing::warn!(url, error = %first, "ScrapingBee request failed, retrying once");
                self.fetch_once(url, params).await
            }
        }
    }

    async fn fetch_once(&self, url: &str, params: &ScrapeParams) -> Result<ScrapeResponse> {
        let mut query: Vec<(&str, String)> = vec![
            ("api_key", self.api_key.clone()),
            ("url", url.to_string()),
            ("render_js", params.render_js.to_string()),
        ];
        if params.render_js && params.wait_ms > 0 {
            query.push(("wait", params.wait_ms.to_string()));
        }
        if params.premium_proxy {
            query.push(("premium_proxy", "true".to_string()));
        }
        if let Some(cc) = &params.country_code {
            query.push(("country_code", cc.clone()));
        }

        let resp = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScrapingBeeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let target_status = resp
            .headers()
            .get(ORIGINAL_STATUS_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(status.as_u16());

        if target_status >= 400 {
            return Err(ScrapingBeeError::TargetStatus {
                status: target_status,
            });
        }

        let resolved_url = resp
            .headers()
            .get(RESOLVED_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let html = resp.text().await?;
        if html.trim().is_empty() {
            return Err(ScrapingBeeError::EmptyBody);
        }

        tracing::debug!(url, bytes = html.len(), target_status, "ScrapingBee fetch completed");

        Ok(ScrapeResponse {
            html,
            status: target_status,
            resolved_url,
        })
    }
}
