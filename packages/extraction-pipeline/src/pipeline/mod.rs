//! The orchestrator: one strictly sequential run per URL.
//!
//! fetch (skipped when HTML is pre-supplied) -> classify (skipped per
//! hint) -> structured-data pre-extraction -> content cleaning -> primary
//! extraction (the only retried stage) -> structured merge -> validation
//! -> inference escalation -> conditional enrichment -> metadata.
//!
//! Only a fetch failure or an exhausted-retry extraction failure ever
//! reaches the caller; every other stage degrades locally.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classify::TypeClassifier;
use crate::config::PipelineConfig;
use crate::content::{self, clean_for_extraction};
use crate::enrich::EnrichmentSearcher;
use crate::error::{PipelineError, Result};
use crate::escalate::InferenceEscalator;
use crate::extract::{merge_structured, PrimaryExtractor};
use crate::preextract::preextract;
use crate::schema::SchemaRegistry;
use crate::traits::fetcher::PageFetcher;
use crate::traits::llm::LlmClient;
use crate::traits::searcher::Searcher;
use crate::types::record::FieldMap;
use crate::types::{
    Classification, ContentDomain, Detection, ExtractedRecord, ExtractionRequest, FetchMethod,
    Granularity, RawFetchResult,
};
use crate::validate::Validator;

/// The extraction pipeline. Construct once, run many URLs.
///
/// External clients are injected; the pipeline owns no globals. Runs are
/// independent, so callers may invoke [`Pipeline::run`] concurrently -
/// the shared per-host rate limiter inside the fetch strategy is the only
/// cross-run state.
pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    registry: Arc<SchemaRegistry>,
    classifier: TypeClassifier,
    extractor: PrimaryExtractor,
    validator: Validator,
    escalator: InferenceEscalator,
    enricher: Option<EnrichmentSearcher>,
    llm: Arc<dyn LlmClient>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        llm: Arc<dyn LlmClient>,
        config: PipelineConfig,
    ) -> Self {
        let registry = Arc::new(SchemaRegistry::new());
        Self {
            fetcher,
            classifier: TypeClassifier::new().with_llm(llm.clone()),
            extractor: PrimaryExtractor::new(llm.clone(), registry.clone()),
            validator: Validator::new(registry.clone(), config.currency.clone()),
            escalator: InferenceEscalator::new(llm.clone(), registry.clone()),
            enricher: None,
            registry,
            llm,
            config,
        }
    }

    /// Enable search-backed classification and enrichment.
    pub fn with_searcher(mut self, searcher: Arc<dyn Searcher>) -> Self {
        self.classifier = TypeClassifier::new()
            .with_llm(self.llm.clone())
            .with_searcher(searcher.clone());
        self.enricher = Some(EnrichmentSearcher::new(
            searcher,
            self.llm.clone(),
            self.registry.clone(),
            self.config.currency.clone(),
        ));
        self
    }

    /// Process one URL into a record.
    pub async fn run(&self, request: ExtractionRequest) -> Result<ExtractedRecord> {
        let url = request.url.clone();
        info!(url = %url, "pipeline run starting");

        // Fetch, unless the caller brought their own HTML.
        let fetched = match &request.raw_html {
            Some(html) => {
                debug!(url = %url, "using pre-supplied HTML, skipping fetch");
                let text = content::html_to_text(html);
                RawFetchResult::new(&url, html.clone(), FetchMethod::Provided).with_text(text)
            }
            None => self.fetcher.fetch(&url).await?,
        };

        let cleaned = clean_for_extraction(&fetched.html, &self.config.clean);
        debug!(
            url = %url,
            fragments = cleaned.fragment_count,
            truncated = cleaned.truncated,
            "content cleaned"
        );

        // Classify, honoring hints per cascade.
        let domain_detection = match request.domain_hint {
            Some(domain) => Detection::new(domain, 1.0, "hint"),
            None => self.classifier.classify_domain(&url).await,
        };
        let granularity_detection = match request.granularity_hint {
            Some(granularity) => Detection::new(granularity, 1.0, "hint"),
            None => {
                self.classifier
                    .classify_granularity(&url, Some(&cleaned.text))
                    .await
            }
        };
        let classification =
            Classification::from_detections(domain_detection, granularity_detection);
        info!(
            url = %url,
            domain = %classification.domain,
            granularity = %classification.granularity,
            confidence = classification.confidence,
            method = %classification.method,
            "page classified"
        );

        let schema = self.registry.schema(classification.domain);
        let structured = preextract(&fetched.html, schema);

        // The only retried stage.
        let (mut raw_fields, extraction_tokens) = self
            .extract_with_retry(&cleaned.text, classification.domain, classification.granularity)
            .await?;

        let structured_filled = merge_structured(&mut raw_fields, &structured);
        if !structured_filled.is_empty() {
            debug!(url = %url, filled = ?structured_filled, "structured data filled model gaps");
        }

        let mut record = self.validator.validate(
            raw_fields,
            classification.domain,
            classification.granularity,
            &structured_filled,
            Some(&cleaned.text),
        );
        record.add_tokens(extraction_tokens);

        let policy = self.config.escalation_for(classification.domain);
        self.escalator
            .escalate(&mut record, &cleaned.text, &policy)
            .await;

        if let Some(enricher) = &self.enricher {
            enricher.enrich(&mut record, &url).await;
        } else if !record.empty_fields(schema.critical).is_empty() {
            debug!(url = %url, "critical fields missing but no searcher configured");
        }

        record.source_url = url.clone();
        record.raw_snapshot = truncate_chars(&cleaned.text, self.config.snapshot_max_chars);

        info!(
            url = %url,
            fields = record.populated_fields().len(),
            confidence = record.extraction_confidence,
            tokens = record.tokens_used,
            "pipeline run finished"
        );
        Ok(record)
    }

    /// Retry wrapper around primary extraction: exponential backoff, the
    /// delay doubling on each attempt, and the last error surfacing once
    /// `max_retries` is exhausted.
    async fn extract_with_retry(
        &self,
        cleaned_content: &str,
        domain: ContentDomain,
        granularity: Granularity,
    ) -> std::result::Result<(FieldMap, u64), PipelineError> {
        let mut delay = self.config.retry_initial_delay;
        let mut attempt: u32 = 0;

        loop {
            match self
                .extractor
                .extract(cleaned_content, domain, granularity)
                .await
            {
                Ok(result) => return Ok(result),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "extraction failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(PipelineError::Extraction(e)),
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::testing::{MockFetcher, MockLlm};
    use crate::traits::searcher::MockSearcher;
    use serde_json::json;
    use std::time::Duration;

    const TOUR_URL: &str = "https://example.com/tour/42-arenal-hike";

    const TOUR_HTML: &str = r#"<html><head><title>Arenal Hike</title></head><body>
        <h1>Arenal Volcano Hike</h1>
        <p>A guided hike on the slopes of Arenal Volcano near La Fortuna.</p>
        <p>Price: $65 per person. Duration: 4 hours.</p>
    </body></html>"#;

    const TOUR_RESPONSE: &str = r#"{
        "name": "Arenal Volcano Hike",
        "name_evidence": "Arenal Volcano Hike",
        "name_confidence": 0.95,
        "price": "$65",
        "price_evidence": "Price: $65 per person",
        "price_confidence": 0.9,
        "duration_hours": 4,
        "duration_hours_evidence": "Duration: 4 hours",
        "duration_hours_confidence": 0.9,
        "location": "La Fortuna",
        "location_evidence": "near La Fortuna",
        "location_confidence": 0.8
    }"#;

    fn tour_request() -> ExtractionRequest {
        ExtractionRequest::new(TOUR_URL)
            .with_domain_hint(ContentDomain::Tour)
            .with_granularity_hint(Granularity::Specific)
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig::default().with_retry_initial_delay(Duration::from_millis(1))
    }

    fn fetcher_with_tour_page() -> MockFetcher {
        MockFetcher::new().with_page(
            TOUR_URL,
            RawFetchResult::new(TOUR_URL, TOUR_HTML, FetchMethod::Http)
                .with_text(content::html_to_text(TOUR_HTML)),
        )
    }

    #[tokio::test]
    async fn end_to_end_run_produces_a_normalized_record() {
        let llm = MockLlm::new().with_response(TOUR_RESPONSE);
        let pipeline = Pipeline::new(
            Arc::new(fetcher_with_tour_page()),
            Arc::new(llm),
            fast_config(),
        );

        let record = pipeline.run(tour_request()).await.unwrap();

        assert_eq!(record.content_domain, ContentDomain::Tour);
        assert_eq!(record.page_granularity, Granularity::Specific);
        assert_eq!(record.field("name"), &json!("Arenal Volcano Hike"));
        assert_eq!(record.field("price"), &json!(65.0));
        assert_eq!(record.field("duration_hours"), &json!(4.0));
        assert_eq!(record.source_url, TOUR_URL);
        assert!(!record.raw_snapshot.is_empty());
        assert!(record.tokens_used > 0);
        assert!((0.0..=1.0).contains(&record.extraction_confidence));
    }

    #[tokio::test]
    async fn pre_supplied_html_skips_the_fetch_stage() {
        let fetcher = Arc::new(MockFetcher::new());
        let llm = MockLlm::new().with_response(TOUR_RESPONSE);
        let pipeline = Pipeline::new(fetcher.clone(), Arc::new(llm), fast_config());

        let record = pipeline
            .run(tour_request().with_raw_html(TOUR_HTML))
            .await
            .unwrap();

        assert!(fetcher.calls().is_empty());
        assert_eq!(record.field("name"), &json!("Arenal Volcano Hike"));
    }

    #[tokio::test]
    async fn fetch_failure_is_terminal() {
        let fetcher = MockFetcher::new().failing_for(TOUR_URL);
        let pipeline = Pipeline::new(
            Arc::new(fetcher),
            Arc::new(MockLlm::new()),
            fast_config(),
        );

        let result = pipeline.run(tour_request()).await;
        assert!(matches!(result, Err(PipelineError::Fetch(FetchError::Http(_)))));
    }

    #[tokio::test]
    async fn extraction_recovers_within_the_retry_budget() {
        // Two failures, then success, with max_retries = 2.
        let llm = MockLlm::new()
            .with_error()
            .with_error()
            .with_response(TOUR_RESPONSE);
        let pipeline = Pipeline::new(
            Arc::new(fetcher_with_tour_page()),
            Arc::new(llm),
            fast_config().with_max_retries(2),
        );

        let record = pipeline.run(tour_request()).await.unwrap();
        assert_eq!(record.field("name"), &json!("Arenal Volcano Hike"));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_last_error() {
        // Three failures against max_retries = 2.
        let llm = MockLlm::new().with_error().with_error().with_error();
        let pipeline = Pipeline::new(
            Arc::new(fetcher_with_tour_page()),
            Arc::new(llm),
            fast_config().with_max_retries(2),
        );

        let result = pipeline.run(tour_request()).await;
        assert!(matches!(result, Err(PipelineError::Extraction(_))));
    }

    #[tokio::test]
    async fn structured_data_fills_gaps_and_enrichment_completes_criticals() {
        let html = r#"<html><body>
            <h1>Soda La Selva</h1>
            <script type="application/ld+json">
            {"@type": "Restaurant", "telephone": "+506 2222 3333",
             "servesCuisine": "Costa Rican",
             "address": {"streetAddress": "Calle 5", "addressLocality": "Quepos"}}
            </script>
        </body></html>"#;

        let url = "https://example.com/restaurant/soda-la-selva";
        let fetcher = MockFetcher::new().with_page(
            url,
            RawFetchResult::new(url, html, FetchMethod::Http)
                .with_text(content::html_to_text(html)),
        );

        // The model only finds the name; phone/cuisine/location come from
        // structured data, so nothing critical is left for enrichment.
        let llm = MockLlm::new().with_response(
            r#"{"name": "Soda La Selva", "name_evidence": "Soda La Selva", "name_confidence": 0.9}"#,
        );
        let searcher = Arc::new(MockSearcher::new());
        let pipeline = Pipeline::new(Arc::new(fetcher), Arc::new(llm), fast_config())
            .with_searcher(searcher.clone());

        let record = pipeline
            .run(
                ExtractionRequest::new(url)
                    .with_domain_hint(ContentDomain::Restaurant)
                    .with_granularity_hint(Granularity::Specific),
            )
            .await
            .unwrap();

        assert_eq!(record.field("phone"), &json!("+506 2222 3333"));
        assert_eq!(record.field("cuisine"), &json!("Costa Rican"));
        assert_eq!(record.field("location"), &json!("Calle 5, Quepos"));
        // structured data satisfied the critical set; no search happened
        assert!(searcher.queries().is_empty());
        assert!(record.enrichment.is_none());
    }

    #[tokio::test]
    async fn enrichment_runs_when_criticals_survive_escalation() {
        let html = r#"<html><body><h1>San Jose - Quepos</h1>
            <p>Direct bus service on the coastal highway.</p></body></html>"#;
        let url = "https://example.com/route/sj-quepos";
        let fetcher = MockFetcher::new().with_page(
            url,
            RawFetchResult::new(url, html, FetchMethod::Http)
                .with_text(content::html_to_text(html)),
        );

        // Primary extraction misses the fare; escalation declines too
        // (fare is not inferable for transport); enrichment finds it.
        let llm = MockLlm::new()
            .with_response(
                r#"{"name": "San Jose - Quepos bus",
                    "name_evidence": "San Jose - Quepos",
                    "origin": "San Jose", "origin_evidence": "San Jose",
                    "destination": "Quepos", "destination_evidence": "Quepos"}"#,
            )
            .with_response(r#"{"fare": "USD 9.50"}"#);
        let searcher =
            Arc::new(MockSearcher::new().with_any_answer("The direct bus costs USD 9.50."));

        let pipeline = Pipeline::new(Arc::new(fetcher), Arc::new(llm), fast_config())
            .with_searcher(searcher.clone());

        let record = pipeline
            .run(
                ExtractionRequest::new(url)
                    .with_domain_hint(ContentDomain::Transport)
                    .with_granularity_hint(Granularity::Specific),
            )
            .await
            .unwrap();

        assert_eq!(record.field("fare"), &json!(9.5));
        assert_eq!(searcher.queries().len(), 1);
        assert!(record.enrichment.is_some());
    }

    #[tokio::test]
    async fn snapshot_is_truncated_to_the_configured_cap() {
        let body: String = (0..2_000)
            .map(|i| format!("<p>Paragraph number {i} with plenty of text inside.</p>"))
            .collect();
        let html = format!("<html><body>{body}</body></html>");
        let url = "https://example.com/tour/long";
        let fetcher = MockFetcher::new().with_page(
            url,
            RawFetchResult::new(url, html.clone(), FetchMethod::Http)
                .with_text(content::html_to_text(&html)),
        );
        let llm = MockLlm::new().with_response(r#"{"name": "Long Tour"}"#);

        let mut config = fast_config();
        config.snapshot_max_chars = 500;
        let pipeline = Pipeline::new(Arc::new(fetcher), Arc::new(llm), config);

        let record = pipeline
            .run(
                ExtractionRequest::new(url)
                    .with_domain_hint(ContentDomain::Tour)
                    .with_granularity_hint(Granularity::Specific),
            )
            .await
            .unwrap();

        assert!(record.raw_snapshot.chars().count() <= 500);
    }
}
