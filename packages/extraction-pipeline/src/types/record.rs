//! The extraction record - the pipeline's sole durable output.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::classify::{ContentDomain, Granularity};

/// Ordered field-name -> value map. Only fields in the active schema's
/// allowed set ever appear here.
pub type FieldMap = IndexMap<String, Value>;

/// Where a field value came from.
///
/// Every non-null field carries one of these in the record's evidence map:
/// a verbatim quote from the source, or a tag naming the non-quoted origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Verbatim source-text fragment cited by the model.
    Quote {
        text: String,
        /// Whether the quote was confirmed to be a substring of the
        /// cleaned source content. `None` when no check ran.
        #[serde(skip_serializing_if = "Option::is_none")]
        verified: Option<bool>,
    },

    /// Parsed from an embedded machine-readable block.
    StructuredData,

    /// Derived by a follow-up inference pass.
    Inferred,

    /// Sourced from an external web search.
    WebSearch,
}

impl Provenance {
    pub fn quote(text: impl Into<String>) -> Self {
        Provenance::Quote {
            text: text.into(),
            verified: None,
        }
    }
}

/// A source consulted by the enrichment search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSource {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// A citation within the enrichment answer. Spans are byte offsets into
/// the answer text when the search backend reports them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

/// Raw material attached when the enrichment search produced an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentContext {
    pub answer: String,
    pub sources: Vec<SearchSource>,
    pub citations: Vec<Citation>,
}

/// The typed, schema-constrained, confidence-scored output of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Schema fields and their normalized values.
    pub fields: FieldMap,

    /// Per-field provenance.
    pub evidence: IndexMap<String, Provenance>,

    /// Per-field confidence, each in [0, 1].
    pub confidence: IndexMap<String, f64>,

    /// Overall extraction confidence in [0, 1].
    pub extraction_confidence: f64,

    pub content_domain: ContentDomain,
    pub page_granularity: Granularity,

    pub source_url: String,

    /// Truncated snapshot of the cleaned source content.
    pub raw_snapshot: String,

    /// Total tokens spent across all model calls for this record.
    pub tokens_used: u64,

    /// Present only when the enrichment search returned an answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentContext>,
}

impl ExtractedRecord {
    pub fn new(domain: ContentDomain, granularity: Granularity) -> Self {
        Self {
            fields: FieldMap::new(),
            evidence: IndexMap::new(),
            confidence: IndexMap::new(),
            extraction_confidence: 0.0,
            content_domain: domain,
            page_granularity: granularity,
            source_url: String::new(),
            raw_snapshot: String::new(),
            tokens_used: 0,
            enrichment: None,
        }
    }

    /// Value of a field, `Null` when absent.
    pub fn field(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&Value::Null)
    }

    /// Whether a field is still null / empty string / empty array.
    pub fn is_field_empty(&self, name: &str) -> bool {
        is_empty_value(self.field(name))
    }

    /// Names from `candidates` whose values are still empty.
    pub fn empty_fields<'a>(&self, candidates: &[&'a str]) -> Vec<&'a str> {
        candidates
            .iter()
            .copied()
            .filter(|name| self.is_field_empty(name))
            .collect()
    }

    /// Fill a field only when it is currently empty. Returns whether the
    /// value was written. Already-populated fields are never touched.
    pub fn fill_if_empty(
        &mut self,
        name: &str,
        value: Value,
        provenance: Provenance,
        confidence: f64,
    ) -> bool {
        if is_empty_value(&value) || !self.is_field_empty(name) {
            return false;
        }
        self.fields.insert(name.to_string(), value);
        self.evidence.insert(name.to_string(), provenance);
        self.confidence
            .insert(name.to_string(), confidence.clamp(0.0, 1.0));
        true
    }

    pub fn add_tokens(&mut self, tokens: u64) {
        self.tokens_used += tokens;
    }

    /// Names of fields with a non-empty value.
    pub fn populated_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, v)| !is_empty_value(v))
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

/// The pipeline-wide notion of "empty": null, blank string, or empty array.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_value_covers_null_blank_and_empty_array() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!("   ")));
        assert!(is_empty_value(&json!([])));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!("x")));
        assert!(!is_empty_value(&json!(["x"])));
    }

    #[test]
    fn fill_if_empty_never_overwrites() {
        let mut record = ExtractedRecord::new(ContentDomain::Tour, Granularity::Specific);
        assert!(record.fill_if_empty("name", json!("Arenal Hike"), Provenance::Inferred, 0.4));
        assert!(!record.fill_if_empty(
            "name",
            json!("Other Tour"),
            Provenance::WebSearch,
            0.9
        ));
        assert_eq!(record.field("name"), &json!("Arenal Hike"));
        assert_eq!(record.evidence.get("name"), Some(&Provenance::Inferred));
    }

    #[test]
    fn fill_if_empty_rejects_empty_incoming_values() {
        let mut record = ExtractedRecord::new(ContentDomain::Tour, Granularity::Specific);
        assert!(!record.fill_if_empty("name", Value::Null, Provenance::Inferred, 0.4));
        assert!(!record.fill_if_empty("name", json!([]), Provenance::Inferred, 0.4));
        assert!(record.is_field_empty("name"));
    }

    #[test]
    fn empty_fields_reports_only_missing_candidates() {
        let mut record = ExtractedRecord::new(ContentDomain::Restaurant, Granularity::Specific);
        record.fill_if_empty("name", json!("Soda Tica"), Provenance::quote("Soda Tica"), 0.9);
        record.fields.insert("cuisine".into(), Value::Null);
        let missing = record.empty_fields(&["name", "cuisine", "phone"]);
        assert_eq!(missing, vec!["cuisine", "phone"]);
    }
}
