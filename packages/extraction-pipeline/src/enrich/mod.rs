//! Search-based enrichment, the pipeline's last resort.
//!
//! Runs only when critical fields survived escalation empty. One web
//! search built from the record's identifying fields, answer attached as
//! enrichment context, then one structured re-extraction call that parses
//! the answer into the still-missing fields. Merge fills gaps only. The
//! stage cannot fail the pipeline.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::extract::parse_field_response;
use crate::schema::{prompts, SchemaRegistry};
use crate::traits::llm::LlmClient;
use crate::traits::searcher::Searcher;
use crate::types::{EnrichmentContext, ExtractedRecord, Provenance};
use crate::validate::{coerce_value, CurrencyConfig};

/// Confidence assigned to search-sourced values.
const WEB_SEARCH_CONFIDENCE: f64 = 0.5;

pub struct EnrichmentSearcher {
    searcher: Arc<dyn Searcher>,
    llm: Arc<dyn LlmClient>,
    registry: Arc<SchemaRegistry>,
    currency: CurrencyConfig,
}

impl EnrichmentSearcher {
    pub fn new(
        searcher: Arc<dyn Searcher>,
        llm: Arc<dyn LlmClient>,
        registry: Arc<SchemaRegistry>,
        currency: CurrencyConfig,
    ) -> Self {
        Self {
            searcher,
            llm,
            registry,
            currency,
        }
    }

    /// Enrich a record whose critical fields are still empty. Mutates the
    /// record in place; never fails.
    pub async fn enrich(&self, record: &mut ExtractedRecord, url: &str) {
        let schema = self.registry.schema(record.content_domain);
        let missing = record.empty_fields(schema.critical);
        if missing.is_empty() {
            return;
        }

        let subject = identify_subject(record, url);
        let query = build_query(&subject, record, &missing);
        debug!(url, query = %query, "running enrichment search");

        let answer = match self.searcher.search(&query).await {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => {
                debug!(url, "enrichment search returned no answer");
                return;
            }
            Err(e) => {
                warn!(url, error = %e, "enrichment search failed");
                return;
            }
        };

        // Attach the raw answer before trying to structure it; a failed
        // re-extraction still leaves the context on the record.
        record.enrichment = Some(EnrichmentContext {
            answer: answer.answer.clone(),
            sources: answer.sources.clone(),
            citations: answer.citations.clone(),
        });

        let prompt = prompts::format_enrich_prompt(&subject, &answer.answer, &missing);
        let response = match self.llm.complete_json(prompts::ENRICH_SYSTEM, &prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "enrichment re-extraction failed");
                return;
            }
        };
        record.add_tokens(response.tokens_used);

        let fields = match parse_field_response(&response.text) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(url, error = %e, "unparsable enrichment output");
                return;
            }
        };

        let mut filled = 0;
        for (name, value) in fields {
            if !missing.contains(&name.as_str()) {
                continue;
            }
            let Some(kind) = schema.kind_of(&name) else {
                continue;
            };
            let Some(coerced) = coerce_value(&value, kind, &self.currency) else {
                debug!(field = %name, ?value, "enrichment value failed coercion");
                continue;
            };
            if record.fill_if_empty(&name, coerced, Provenance::WebSearch, WEB_SEARCH_CONFIDENCE) {
                filled += 1;
            }
        }
        debug!(url, filled, "enrichment merged");
    }
}

/// The best identifying phrase we have for the search query.
fn identify_subject(record: &ExtractedRecord, url: &str) -> String {
    let name = record.field("name").as_str().unwrap_or_default();
    let location = record.field("location").as_str().unwrap_or_default();

    match (name.is_empty(), location.is_empty()) {
        (false, false) => format!("{name} {location}"),
        (false, true) => name.to_string(),
        _ => url.to_string(),
    }
}

fn build_query(subject: &str, record: &ExtractedRecord, missing: &[&str]) -> String {
    let categories = missing.join(" ");
    format!(
        "{} {} {}",
        subject,
        record.content_domain.as_str().replace('_', " "),
        categories
    )
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLlm;
    use crate::traits::searcher::MockSearcher;
    use crate::types::{ContentDomain, Granularity};
    use serde_json::json;

    fn transport_record() -> ExtractedRecord {
        let mut record = ExtractedRecord::new(ContentDomain::Transport, Granularity::Specific);
        record.fill_if_empty(
            "name",
            json!("San Jose - Quepos bus"),
            Provenance::quote("San Jose - Quepos"),
            0.9,
        );
        record.fill_if_empty("origin", json!("San Jose"), Provenance::quote("San Jose"), 0.9);
        record.fill_if_empty("destination", json!("Quepos"), Provenance::quote("Quepos"), 0.9);
        record
    }

    #[tokio::test]
    async fn no_missing_critical_fields_skips_the_search() {
        let searcher = Arc::new(MockSearcher::new());
        let llm = Arc::new(MockLlm::new());
        let enricher = EnrichmentSearcher::new(
            searcher.clone(),
            llm.clone(),
            Arc::new(SchemaRegistry::new()),
            CurrencyConfig::default(),
        );

        let mut record = transport_record();
        record.fill_if_empty("fare", json!(9.5), Provenance::quote("$9.50"), 0.9);

        enricher.enrich(&mut record, "https://example.com/route/1").await;

        assert!(searcher.queries().is_empty());
        assert!(record.enrichment.is_none());
    }

    #[tokio::test]
    async fn fills_missing_fields_from_the_search_answer() {
        let searcher = Arc::new(
            MockSearcher::new().with_any_answer("The direct bus costs USD 9.50 one way."),
        );
        let llm = MockLlm::new().with_response(r#"{"fare": "USD 9.50", "origin": "Hijack"}"#);
        let enricher = EnrichmentSearcher::new(
            searcher,
            Arc::new(llm),
            Arc::new(SchemaRegistry::new()),
            CurrencyConfig::default(),
        );

        let mut record = transport_record();
        enricher.enrich(&mut record, "https://example.com/route/1").await;

        assert_eq!(record.field("fare"), &json!(9.5));
        assert_eq!(record.evidence.get("fare"), Some(&Provenance::WebSearch));
        // populated fields are never replaced
        assert_eq!(record.field("origin"), &json!("San Jose"));

        let enrichment = record.enrichment.as_ref().unwrap();
        assert!(enrichment.answer.contains("USD 9.50"));
        assert!(!enrichment.sources.is_empty());
    }

    #[tokio::test]
    async fn empty_answer_leaves_the_record_untouched() {
        let searcher = Arc::new(MockSearcher::new());
        let llm = Arc::new(MockLlm::new());
        let enricher = EnrichmentSearcher::new(
            searcher,
            llm.clone(),
            Arc::new(SchemaRegistry::new()),
            CurrencyConfig::default(),
        );

        let mut record = transport_record();
        enricher.enrich(&mut record, "https://example.com/route/1").await;

        assert!(record.enrichment.is_none());
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn search_failure_never_fails_the_stage() {
        let searcher = Arc::new(MockSearcher::failing());
        let llm = Arc::new(MockLlm::new());
        let enricher = EnrichmentSearcher::new(
            searcher,
            llm,
            Arc::new(SchemaRegistry::new()),
            CurrencyConfig::default(),
        );

        let mut record = transport_record();
        enricher.enrich(&mut record, "https://example.com/route/1").await;
        assert!(record.enrichment.is_none());
    }

    #[tokio::test]
    async fn failed_reextraction_still_attaches_the_context() {
        let searcher =
            Arc::new(MockSearcher::new().with_any_answer("The fare is about USD 10."));
        let llm = MockLlm::new().with_error();
        let enricher = EnrichmentSearcher::new(
            searcher,
            Arc::new(llm),
            Arc::new(SchemaRegistry::new()),
            CurrencyConfig::default(),
        );

        let mut record = transport_record();
        enricher.enrich(&mut record, "https://example.com/route/1").await;

        assert!(record.enrichment.is_some());
        assert!(record.is_field_empty("fare"));
    }
}
