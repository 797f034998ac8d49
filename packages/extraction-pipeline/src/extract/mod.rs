//! Primary schema-guided extraction.
//!
//! One JSON-mode model call per page, against the prompt template the
//! registry dispatches for `(domain, granularity)`. The output is the raw
//! field map (values plus `_evidence`/`_confidence` entries); the
//! validator turns it into a record.

use std::sync::Arc;
use tracing::debug;

use crate::error::ExtractionError;
use crate::schema::{prompts, SchemaRegistry};
use crate::traits::llm::LlmClient;
use crate::types::record::{is_empty_value, FieldMap};
use crate::types::{ContentDomain, Granularity};

pub struct PrimaryExtractor {
    llm: Arc<dyn LlmClient>,
    registry: Arc<SchemaRegistry>,
}

impl PrimaryExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<SchemaRegistry>) -> Self {
        Self { llm, registry }
    }

    /// Run one extraction call. Returns the raw field map and the tokens
    /// spent. Fails on malformed or empty model output; the orchestrator
    /// owns retries.
    pub async fn extract(
        &self,
        cleaned_content: &str,
        domain: ContentDomain,
        granularity: Granularity,
    ) -> Result<(FieldMap, u64), ExtractionError> {
        let schema = self.registry.schema(domain);
        let prompt = self
            .registry
            .template(domain, granularity)
            .replace("{fields}", &schema.prompt_field_list())
            .replace("{content}", cleaned_content);

        let response = self
            .llm
            .complete_json(prompts::EXTRACT_SYSTEM, &prompt)
            .await?;

        let fields = parse_field_response(&response.text)?;
        if fields.values().all(is_empty_value) {
            return Err(ExtractionError::EmptyResponse);
        }

        debug!(
            domain = %domain,
            granularity = %granularity,
            field_count = fields.len(),
            tokens = response.tokens_used,
            "primary extraction completed"
        );

        Ok((fields, response.tokens_used))
    }
}

/// Parse a model completion into a field map. Tolerates code fences and
/// prose around the JSON object, rejects everything else.
pub fn parse_field_response(text: &str) -> Result<FieldMap, ExtractionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let start = trimmed
        .find('{')
        .ok_or_else(|| ExtractionError::MalformedResponse {
            reason: "no JSON object in output".to_string(),
        })?;
    let end = trimmed
        .rfind('}')
        .ok_or_else(|| ExtractionError::MalformedResponse {
            reason: "unterminated JSON object".to_string(),
        })?;
    if end < start {
        return Err(ExtractionError::MalformedResponse {
            reason: "unterminated JSON object".to_string(),
        });
    }

    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&trimmed[start..=end]).map_err(|e| {
            ExtractionError::MalformedResponse {
                reason: e.to_string(),
            }
        })?;

    Ok(object.into_iter().collect())
}

/// Merge pre-extracted structured data into the model's raw fields.
///
/// A structured-data value only fills a field the model left
/// null/empty/empty-array; the model's positive answer always wins.
/// Returns the names of the fields that were filled.
pub fn merge_structured(model_fields: &mut FieldMap, structured: &FieldMap) -> Vec<String> {
    let mut filled = Vec::new();
    for (name, value) in structured {
        if is_empty_value(value) {
            continue;
        }
        let current_empty = model_fields.get(name).map(is_empty_value).unwrap_or(true);
        if current_empty {
            model_fields.insert(name.clone(), value.clone());
            filled.push(name.clone());
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLlm;
    use serde_json::json;

    #[tokio::test]
    async fn extracts_fields_from_json_completion() {
        let llm = MockLlm::new().with_response(
            r#"{"name": "Arenal Hike", "name_evidence": "Arenal Hike", "name_confidence": 0.9}"#,
        );
        let extractor = PrimaryExtractor::new(Arc::new(llm), Arc::new(SchemaRegistry::new()));

        let (fields, tokens) = extractor
            .extract("Arenal Hike tour page", ContentDomain::Tour, Granularity::Specific)
            .await
            .unwrap();

        assert_eq!(fields.get("name"), Some(&json!("Arenal Hike")));
        assert!(tokens > 0);
    }

    #[tokio::test]
    async fn malformed_output_is_an_extraction_error() {
        let llm = MockLlm::new().with_response("I could not find anything useful.");
        let extractor = PrimaryExtractor::new(Arc::new(llm), Arc::new(SchemaRegistry::new()));

        let result = extractor
            .extract("content", ContentDomain::Tour, Granularity::Specific)
            .await;
        assert!(matches!(
            result,
            Err(ExtractionError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn all_null_output_is_an_empty_response() {
        let llm = MockLlm::new().with_response(r#"{"name": null, "price": null}"#);
        let extractor = PrimaryExtractor::new(Arc::new(llm), Arc::new(SchemaRegistry::new()));

        let result = extractor
            .extract("content", ContentDomain::Tour, Granularity::Specific)
            .await;
        assert!(matches!(result, Err(ExtractionError::EmptyResponse)));
    }

    #[test]
    fn parse_tolerates_code_fences() {
        let fields =
            parse_field_response("```json\n{\"name\": \"Casa Azul\"}\n```").unwrap();
        assert_eq!(fields.get("name"), Some(&json!("Casa Azul")));
    }

    #[test]
    fn structured_data_fills_only_empty_fields() {
        let mut model: FieldMap = [
            ("rating".to_string(), json!(4.2)),
            ("phone".to_string(), serde_json::Value::Null),
            ("cuisine".to_string(), json!([])),
        ]
        .into_iter()
        .collect();

        let structured: FieldMap = [
            ("rating".to_string(), json!(3.0)),
            ("phone".to_string(), json!("+506 2222 3333")),
            ("cuisine".to_string(), json!("Seafood")),
            ("price_tier".to_string(), json!("$$")),
        ]
        .into_iter()
        .collect();

        let filled = merge_structured(&mut model, &structured);

        // model's positive answer wins
        assert_eq!(model.get("rating"), Some(&json!(4.2)));
        // null, empty-array and absent fields are filled
        assert_eq!(model.get("phone"), Some(&json!("+506 2222 3333")));
        assert_eq!(model.get("cuisine"), Some(&json!("Seafood")));
        assert_eq!(model.get("price_tier"), Some(&json!("$$")));
        assert_eq!(filled, vec!["phone", "cuisine", "price_tier"]);
    }
}
