//! Input to a pipeline run.

use serde::{Deserialize, Serialize};

use super::classify::{ContentDomain, Granularity};

/// A request to extract one URL.
///
/// Callers may pre-supply the page HTML (skipping the fetch stage) and may
/// pin the classification with hints; everything else is resolved by the
/// pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// The page to extract.
    pub url: String,

    /// Pre-fetched HTML; when set, the fetch stage is skipped.
    pub raw_html: Option<String>,

    /// Pin the content domain instead of classifying.
    pub domain_hint: Option<ContentDomain>,

    /// Pin the page granularity instead of classifying.
    pub granularity_hint: Option<Granularity>,
}

impl ExtractionRequest {
    /// Create a request for a URL with no hints.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            raw_html: None,
            domain_hint: None,
            granularity_hint: None,
        }
    }

    /// Supply pre-fetched HTML.
    pub fn with_raw_html(mut self, html: impl Into<String>) -> Self {
        self.raw_html = Some(html.into());
        self
    }

    /// Pin the content domain.
    pub fn with_domain_hint(mut self, domain: ContentDomain) -> Self {
        self.domain_hint = Some(domain);
        self
    }

    /// Pin the granularity.
    pub fn with_granularity_hint(mut self, granularity: Granularity) -> Self {
        self.granularity_hint = Some(granularity);
        self
    }
}
