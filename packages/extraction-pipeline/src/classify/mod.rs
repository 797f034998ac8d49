//! Cascading domain and granularity classification.
//!
//! Two independent detector cascades, each an ordered strategy chain that
//! stops at the first sufficiently confident result. Neither cascade ever
//! returns an error: every fallible step degrades to the previous
//! detector's answer, bottoming out at a low-confidence default.

pub mod domain;
pub mod granularity;

use std::sync::Arc;
use tracing::debug;

use crate::schema::prompts;
use crate::traits::llm::LlmClient;
use crate::traits::searcher::Searcher;
use crate::types::{Classification, ContentDomain, Detection, Granularity};

/// Confidence of a Level-2 (LLM-confirmed) granularity answer.
const LLM_GRANULARITY_CONFIDENCE: f64 = 0.85;

/// Confidence of a search-backed domain classification.
const SEARCH_DOMAIN_CONFIDENCE: f64 = 0.8;

/// Confidence of the terminal `General` fallback.
const FALLBACK_DOMAIN_CONFIDENCE: f64 = 0.3;

pub struct TypeClassifier {
    llm: Option<Arc<dyn LlmClient>>,
    searcher: Option<Arc<dyn Searcher>>,
}

impl TypeClassifier {
    /// Heuristics-only classifier.
    pub fn new() -> Self {
        Self {
            llm: None,
            searcher: None,
        }
    }

    /// Enable the Level-2 LLM confirmation step.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Enable the search-backed domain step.
    pub fn with_searcher(mut self, searcher: Arc<dyn Searcher>) -> Self {
        self.searcher = Some(searcher);
        self
    }

    /// Classify a page. `content` sharpens the LLM steps when available.
    pub async fn classify(&self, url: &str, content: Option<&str>) -> Classification {
        let domain = self.classify_domain(url).await;
        let granularity = self.classify_granularity(url, content).await;

        debug!(
            url,
            domain = %domain.value,
            domain_method = domain.method,
            granularity = %granularity.value,
            granularity_method = granularity.method,
            "classification finished"
        );

        Classification::from_detections(domain, granularity)
    }

    /// Granularity cascade: URL-path heuristics, then an LLM confirmation
    /// when the heuristic was only the no-match default.
    pub async fn classify_granularity(
        &self,
        url: &str,
        content: Option<&str>,
    ) -> Detection<Granularity> {
        let level1 = granularity::detect_from_path(url);

        // A marker match is as good as Level 1 gets; only the ambiguous
        // no-match default is worth an LLM call.
        if level1.method != granularity::DEFAULT_METHOD {
            return level1;
        }

        let Some(llm) = &self.llm else {
            return level1;
        };

        let content_section = content
            .map(|c| {
                let snippet: String = c.chars().take(2_000).collect();
                format!("Content excerpt:\n{snippet}")
            })
            .unwrap_or_default();
        let prompt = prompts::GRANULARITY_PROMPT
            .replace("{url}", url)
            .replace("{content_section}", &content_section);

        match llm.complete("You classify web pages.", &prompt).await {
            Ok(response) => {
                let answer = response.text.trim().to_uppercase();
                let has_specific = answer.contains("SPECIFIC");
                let has_general = answer.contains("GENERAL");
                match (has_specific, has_general) {
                    (true, false) => Detection::new(
                        Granularity::Specific,
                        LLM_GRANULARITY_CONFIDENCE,
                        "llm",
                    ),
                    (false, true) => Detection::new(
                        Granularity::General,
                        LLM_GRANULARITY_CONFIDENCE,
                        "llm",
                    ),
                    _ => {
                        debug!(url, answer = %response.text, "ambiguous granularity answer");
                        level1
                    }
                }
            }
            Err(e) => {
                debug!(url, error = %e, "granularity LLM step failed, keeping heuristic");
                level1
            }
        }
    }

    /// Domain cascade: host/keyword table, then search-backed
    /// classification, then the `General` fallback.
    pub async fn classify_domain(&self, url: &str) -> Detection<ContentDomain> {
        if let Some(detection) = domain::detect_from_url(url) {
            return detection;
        }

        if let (Some(searcher), Some(llm)) = (&self.searcher, &self.llm) {
            match self.search_backed_domain(searcher, llm, url).await {
                Some(detection) => return detection,
                None => debug!(url, "search-backed domain step declined"),
            }
        }

        Detection::new(
            ContentDomain::General,
            FALLBACK_DOMAIN_CONFIDENCE,
            "fallback",
        )
        .with_reasoning("no confident domain signal")
    }

    async fn search_backed_domain(
        &self,
        searcher: &Arc<dyn Searcher>,
        llm: &Arc<dyn LlmClient>,
        url: &str,
    ) -> Option<Detection<ContentDomain>> {
        let query = format!("What kind of page is {url}? Describe its content briefly.");
        let answer = match searcher.search(&query).await {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => return None,
            Err(e) => {
                debug!(url, error = %e, "domain search failed");
                return None;
            }
        };

        let prompt = prompts::DOMAIN_CLASSIFY_PROMPT.replace("{answer}", &answer.answer);
        let response = match llm.complete("You classify web pages.", &prompt).await {
            Ok(response) => response,
            Err(e) => {
                debug!(url, error = %e, "domain classification call failed");
                return None;
            }
        };

        let domain = ContentDomain::parse_loose(response.text.trim())?;
        Some(
            Detection::new(domain, SEARCH_DOMAIN_CONFIDENCE, "search")
                .with_reasoning(answer.answer.chars().take(200).collect::<String>()),
        )
    }
}

impl Default for TypeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLlm;
    use crate::traits::searcher::MockSearcher;

    #[tokio::test]
    async fn cascades_never_fail_even_with_no_backends() {
        let classifier = TypeClassifier::new();
        let classification = classifier
            .classify("https://unknown-site.example.com/somewhere", None)
            .await;
        assert_eq!(classification.domain, ContentDomain::General);
        assert!(classification.confidence > 0.0);
    }

    #[tokio::test]
    async fn marker_match_skips_the_llm_step() {
        // LLM would say GENERAL, but the path marker already answered.
        let llm = MockLlm::new().with_response("GENERAL");
        let classifier = TypeClassifier::new().with_llm(Arc::new(llm));
        let detection = classifier
            .classify_granularity("https://example.com/tour/123-arenal", None)
            .await;
        assert_eq!(detection.value, Granularity::Specific);
        assert_eq!(detection.confidence, 0.6);
    }

    #[tokio::test]
    async fn ambiguous_path_consults_the_llm() {
        let llm = MockLlm::new().with_response("GENERAL");
        let classifier = TypeClassifier::new().with_llm(Arc::new(llm));
        let detection = classifier
            .classify_granularity("https://example.com/page", None)
            .await;
        assert_eq!(detection.value, Granularity::General);
        assert_eq!(detection.confidence, 0.85);
        assert_eq!(detection.method, "llm");
    }

    #[tokio::test]
    async fn ambiguous_llm_answer_falls_back_to_heuristic() {
        let llm = MockLlm::new().with_response("It could be SPECIFIC or GENERAL.");
        let classifier = TypeClassifier::new().with_llm(Arc::new(llm));
        let detection = classifier
            .classify_granularity("https://example.com/page", None)
            .await;
        assert_eq!(detection.value, Granularity::Specific);
        assert_eq!(detection.confidence, 0.5);
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_heuristic() {
        let llm = MockLlm::new().with_error();
        let classifier = TypeClassifier::new().with_llm(Arc::new(llm));
        let detection = classifier
            .classify_granularity("https://example.com/page", None)
            .await;
        assert_eq!(detection.value, Granularity::Specific);
        assert_eq!(detection.confidence, 0.5);
    }

    #[tokio::test]
    async fn search_backed_domain_classification() {
        let searcher = MockSearcher::new().with_any_answer(
            "This page lists a beachfront home for sale in Guanacaste.",
        );
        let llm = MockLlm::new().with_response("property_listing");
        let classifier = TypeClassifier::new()
            .with_llm(Arc::new(llm))
            .with_searcher(Arc::new(searcher));

        let detection = classifier
            .classify_domain("https://unknown-site.example.com/item/9")
            .await;
        assert_eq!(detection.value, ContentDomain::Property);
        assert_eq!(detection.confidence, 0.8);
        assert_eq!(detection.method, "search");
    }

    #[tokio::test]
    async fn search_outage_degrades_to_general() {
        let classifier = TypeClassifier::new()
            .with_llm(Arc::new(MockLlm::new().with_response("property_listing")))
            .with_searcher(Arc::new(MockSearcher::failing()));

        let detection = classifier
            .classify_domain("https://unknown-site.example.com/item/9")
            .await;
        assert_eq!(detection.value, ContentDomain::General);
        assert_eq!(detection.confidence, 0.3);
    }
}
