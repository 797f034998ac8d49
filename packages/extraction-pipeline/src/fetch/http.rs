//! Lightweight HTTP fetcher, the default first tier.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::content;
use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::PageFetcher;
use crate::types::{FetchMethod, RawFetchResult};

/// Plain `reqwest` GET. Fast and cheap, but useless against JS-rendered
/// or bot-protected pages; those fall through to the other tiers.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build HTTP client"),
            user_agent: user_agent.into(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), "ExtractionPipeline/1.0")
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<RawFetchResult> {
        debug!(url, "HTTP fetch starting");

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(url, error = %e, "HTTP request failed");
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Http(Box::new(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP {status}"),
            ))));
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        let text = content::html_to_text(&html);
        let images = content::extract_image_urls(&html, &final_url, RawFetchResult::MAX_IMAGES);
        let title = content::extract_title(&html);

        let mut result = RawFetchResult::new(url, html, FetchMethod::Http)
            .with_text(text)
            .with_images(images);
        if let Some(title) = title {
            result = result.with_title(title);
        }

        debug!(url, bytes = result.html.len(), "HTTP fetch completed");
        Ok(result)
    }

    fn name(&self) -> &str {
        "http"
    }
}
