//! Iterative gap-filling inference.
//!
//! After validation, critical fields that the schema marks inferable may
//! still be empty. The escalator runs follow-up model passes targeting
//! only those fields, merging answers that fill gaps and never touching
//! populated fields. The stage cannot fail the pipeline: any error is
//! logged and the record keeps its prior state. Token usage accumulates
//! on the record regardless of outcome.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::EscalationError;
use crate::extract::parse_field_response;
use crate::schema::{prompts, SchemaRegistry};
use crate::traits::llm::LlmClient;
use crate::types::{ContentDomain, ExtractedRecord, Provenance};

/// Confidence assigned to escalator-inferred values.
const INFERRED_CONFIDENCE: f64 = 0.4;

/// How many escalation rounds a domain gets and whether the last one is
/// aggressive. The round count is policy, not a constant: callers tune it
/// per domain through `PipelineConfig`.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    /// Maximum follow-up passes. Zero disables escalation.
    pub max_rounds: u32,

    /// Run the final round (when it is not also the first) with the
    /// aggressive instruction set and domain heuristics.
    pub aggressive_final_round: bool,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 1,
            aggressive_final_round: false,
        }
    }
}

impl EscalationPolicy {
    /// The default policy for a domain. Property listings historically
    /// need a second, more aggressive pass; everything else gets one.
    pub fn for_domain(domain: ContentDomain) -> Self {
        match domain {
            ContentDomain::Property => Self {
                max_rounds: 2,
                aggressive_final_round: true,
            },
            _ => Self::default(),
        }
    }
}

pub struct InferenceEscalator {
    llm: Arc<dyn LlmClient>,
    registry: Arc<SchemaRegistry>,
}

impl InferenceEscalator {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<SchemaRegistry>) -> Self {
        Self { llm, registry }
    }

    /// Run the escalation rounds the policy allows. Mutates the record in
    /// place; never fails.
    pub async fn escalate(
        &self,
        record: &mut ExtractedRecord,
        full_content: &str,
        policy: &EscalationPolicy,
    ) {
        let schema = self.registry.schema(record.content_domain);

        for round in 1..=policy.max_rounds {
            let targets = record.empty_fields(&schema.inferable_critical());
            if targets.is_empty() {
                debug!(round, "no inferable critical fields missing, stopping");
                return;
            }

            let aggressive = policy.aggressive_final_round && round == policy.max_rounds && round > 1;
            debug!(
                round,
                aggressive,
                targets = ?targets,
                domain = %record.content_domain,
                "running escalation round"
            );

            match self.run_round(record, full_content, &targets, aggressive).await {
                Ok(filled) => {
                    debug!(round, filled, "escalation round merged");
                }
                Err(e) => {
                    warn!(round, error = %e, "escalation round failed, keeping prior record");
                }
            }

            if aggressive && record.content_domain == ContentDomain::Property {
                apply_property_heuristics(record);
            }
        }
    }

    /// One follow-up model call targeting `targets`. Returns how many
    /// fields were filled.
    async fn run_round(
        &self,
        record: &mut ExtractedRecord,
        full_content: &str,
        targets: &[&str],
        aggressive: bool,
    ) -> Result<usize, EscalationError> {
        let known = known_fields_json(record);
        let prompt = prompts::format_escalate_prompt(
            &known,
            targets,
            record.content_domain,
            aggressive,
            full_content,
        );

        let response = self.llm.complete_json(prompts::ESCALATE_SYSTEM, &prompt).await?;
        record.add_tokens(response.tokens_used);

        let fields = match parse_field_response(&response.text) {
            Ok(fields) => fields,
            Err(e) => {
                // Tokens were already counted; the round just yields nothing.
                warn!(error = %e, "unparsable escalation output");
                return Ok(0);
            }
        };

        let mut filled = 0;
        for (name, value) in fields {
            if !targets.contains(&name.as_str()) {
                continue;
            }
            if record.fill_if_empty(&name, value, Provenance::Inferred, INFERRED_CONFIDENCE) {
                filled += 1;
            }
        }
        Ok(filled)
    }
}

/// Compact JSON view of the already-known fields for the prompt.
fn known_fields_json(record: &ExtractedRecord) -> String {
    let known: serde_json::Map<String, serde_json::Value> = record
        .fields
        .iter()
        .filter(|(_, v)| !crate::types::record::is_empty_value(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::Value::Object(known).to_string()
}

/// Deterministic property-domain heuristics for the aggressive round.
fn apply_property_heuristics(record: &mut ExtractedRecord) {
    let is_land = record
        .field("property_type")
        .as_str()
        .map(|t| {
            let t = t.to_lowercase();
            t.contains("land") || t.contains("lot") || t.contains("finca")
        })
        .unwrap_or(false);

    if is_land {
        for field in ["bedrooms", "bathrooms", "parking_spaces"] {
            record.fill_if_empty(
                field,
                serde_json::json!(0),
                Provenance::Inferred,
                INFERRED_CONFIDENCE,
            );
        }
    }

    if record.is_field_empty("description") {
        let name = record.field("name").as_str().map(str::to_string);
        let location = record.field("location").as_str().map(str::to_string);
        let price = record.field("price").as_f64();

        if let Some(name) = name {
            let mut description = name;
            if let Some(location) = location {
                description.push_str(&format!(" in {location}"));
            }
            if let Some(price) = price {
                description.push_str(&format!(", listed at ${price:.2}"));
            }
            description.push('.');
            record.fill_if_empty(
                "description",
                serde_json::Value::String(description),
                Provenance::Inferred,
                INFERRED_CONFIDENCE,
            );
        }
    }
}
