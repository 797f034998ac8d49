//! Anti-bot bypass fetcher backed by the ScrapingBee API.

use async_trait::async_trait;
use scrapingbee_client::{ScrapeParams, ScrapingBeeClient};
use tracing::debug;

use crate::content;
use crate::error::FetchResult;
use crate::traits::fetcher::PageFetcher;
use crate::types::{FetchMethod, RawFetchResult};

/// Fetches through the bypass service: geo-targeted premium proxy with
/// script rendering and a fixed rendering wait. The client itself retries
/// once internally; there are no further retries at this layer.
pub struct BypassFetcher {
    client: ScrapingBeeClient,
    params: ScrapeParams,
}

impl BypassFetcher {
    pub fn new(client: ScrapingBeeClient, render_wait_ms: u64, country_code: Option<String>) -> Self {
        Self {
            client,
            params: ScrapeParams::anti_bot(render_wait_ms, country_code),
        }
    }
}

#[async_trait]
impl PageFetcher for BypassFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<RawFetchResult> {
        debug!(url, "bypass fetch starting");

        let response = self.client.fetch(url, &self.params).await?;

        let text = content::html_to_text(&response.html);
        let images =
            content::extract_image_urls(&response.html, url, RawFetchResult::MAX_IMAGES);
        let title = content::extract_title(&response.html);

        let mut result = RawFetchResult::new(url, response.html, FetchMethod::Bypass)
            .with_text(text)
            .with_images(images);
        if let Some(title) = title {
            result = result.with_title(title);
        }

        debug!(url, bytes = result.html.len(), "bypass fetch completed");
        Ok(result)
    }

    fn name(&self) -> &str {
        "bypass"
    }
}
