//! Page retrieval output. Ephemeral: lives only inside one pipeline run.

use serde::{Deserialize, Serialize};

/// How a page was retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    /// Anti-bot bypass service (proxied, script-rendered).
    Bypass,

    /// Headless-browser rendering.
    Browser,

    /// Lightweight HTTP GET.
    Http,

    /// Caller supplied the HTML; nothing was fetched.
    Provided,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::Bypass => "bypass",
            FetchMethod::Browser => "browser",
            FetchMethod::Http => "http",
            FetchMethod::Provided => "provided",
        }
    }
}

impl std::fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The raw result of fetching one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFetchResult {
    /// URL the content came from.
    pub url: String,

    /// Full page HTML.
    pub html: String,

    /// Tag-stripped plain text.
    pub text: String,

    /// Page title, if one was found.
    pub title: Option<String>,

    /// Up to 10 visible image URLs, resolved against the page URL.
    pub image_urls: Vec<String>,

    /// Which retrieval tier produced this result.
    pub method: FetchMethod,

    /// Whether the fetch produced usable content.
    pub success: bool,
}

impl RawFetchResult {
    /// Maximum number of image URLs collected per page.
    pub const MAX_IMAGES: usize = 10;

    pub fn new(url: impl Into<String>, html: impl Into<String>, method: FetchMethod) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            text: String::new(),
            title: None,
            image_urls: Vec::new(),
            method,
            success: true,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attach image URLs, truncating to [`Self::MAX_IMAGES`].
    pub fn with_images(mut self, mut images: Vec<String>) -> Self {
        images.truncate(Self::MAX_IMAGES);
        self.image_urls = images;
        self
    }

    pub fn has_content(&self) -> bool {
        !self.html.trim().is_empty() || !self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_are_capped_at_ten() {
        let images: Vec<String> = (0..25).map(|i| format!("https://x.com/{i}.jpg")).collect();
        let result =
            RawFetchResult::new("https://x.com", "<html></html>", FetchMethod::Http).with_images(images);
        assert_eq!(result.image_urls.len(), RawFetchResult::MAX_IMAGES);
    }
}
