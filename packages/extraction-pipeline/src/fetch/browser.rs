//! Headless-browser fetcher for JavaScript-heavy pages.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::content;
use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::PageFetcher;
use crate::types::{FetchMethod, RawFetchResult};

/// Renders the page in headless Chromium, waits a fixed delay for
/// client-side rendering to settle, then extracts the DOM HTML.
///
/// A browser instance is launched per fetch; the pipeline's per-URL call
/// rate makes pooling not worth the lifecycle complexity.
pub struct BrowserFetcher {
    /// Fixed wait after navigation before reading the DOM.
    render_wait: Duration,

    /// Overall deadline for launch + navigation + rendering.
    timeout: Duration,
}

impl BrowserFetcher {
    pub fn new(render_wait: Duration, timeout: Duration) -> Self {
        Self {
            render_wait,
            timeout,
        }
    }

    async fn render(&self, url: &str) -> FetchResult<String> {
        let config = BrowserConfig::builder()
            .build()
            .map_err(FetchError::Browser)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        // The handler stream must be polled for the browser to make progress.
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let result = async {
            let page = browser
                .new_page(url)
                .await
                .map_err(|e| FetchError::Browser(e.to_string()))?;

            page.wait_for_navigation()
                .await
                .map_err(|e| FetchError::Browser(e.to_string()))?;

            tokio::time::sleep(self.render_wait).await;

            page.content()
                .await
                .map_err(|e| FetchError::Browser(e.to_string()))
        }
        .await;

        if let Err(e) = browser.close().await {
            warn!(url, error = %e, "failed to close browser cleanly");
        }
        handler_task.abort();

        result
    }
}

impl Default for BrowserFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(60))
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<RawFetchResult> {
        debug!(url, "browser render starting");

        let html = tokio::time::timeout(self.timeout, self.render(url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
            })??;

        let text = content::html_to_text(&html);
        let images = content::extract_image_urls(&html, url, RawFetchResult::MAX_IMAGES);
        let title = content::extract_title(&html);

        let mut result = RawFetchResult::new(url, html, FetchMethod::Browser)
            .with_text(text)
            .with_images(images);
        if let Some(title) = title {
            result = result.with_title(title);
        }

        debug!(url, bytes = result.html.len(), "browser render completed");
        Ok(result)
    }

    fn name(&self) -> &str {
        "browser"
    }
}
