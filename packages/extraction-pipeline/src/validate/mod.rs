//! Validation and normalization of raw extraction output.
//!
//! Turns the model's raw field map into an [`ExtractedRecord`]: splits the
//! `_evidence`/`_confidence` side channels, whitelists fields against the
//! active schema, coerces every value to its declared kind, applies the
//! domain's alias copies and computes the record confidence. A field that
//! fails coercion degrades to null; the record as a whole never aborts.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::schema::{FieldKind, SchemaRegistry};
use crate::types::record::{is_empty_value, FieldMap};
use crate::types::{ContentDomain, ExtractedRecord, Granularity, Provenance};

/// Square feet to square meters.
pub const SQFT_TO_SQM: f64 = 0.092903;

/// Currency normalization settings, supplied by the caller.
#[derive(Debug, Clone)]
pub struct CurrencyConfig {
    /// Exchange rate: how many local-currency units buy one USD.
    pub units_per_usd: f64,

    /// ISO code of the local (source) currency.
    pub local_code: String,

    /// Symbols that mark an amount as local currency.
    pub local_symbols: Vec<String>,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            units_per_usd: 520.0,
            local_code: "CRC".to_string(),
            local_symbols: vec!["₡".to_string()],
        }
    }
}

/// Suffixes splitting the model output into side channels.
const EVIDENCE_SUFFIX: &str = "_evidence";
const CONFIDENCE_SUFFIX: &str = "_confidence";

/// Confidence for fields whose confidence is absent or unparsable.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Confidence assigned to structured-data values.
const STRUCTURED_CONFIDENCE: f64 = 0.9;

/// Multiplier applied when an evidence quote is not found in the source.
const UNVERIFIED_EVIDENCE_PENALTY: f64 = 0.8;

pub struct Validator {
    registry: Arc<SchemaRegistry>,
    currency: CurrencyConfig,
}

impl Validator {
    pub fn new(registry: Arc<SchemaRegistry>, currency: CurrencyConfig) -> Self {
        Self { registry, currency }
    }

    /// Validate and normalize one raw field map into a record.
    ///
    /// `structured_fields` names the entries that came from the
    /// structured-data merge (they get [`Provenance::StructuredData`]);
    /// `source_text` enables evidence substring verification when present.
    pub fn validate(
        &self,
        raw: FieldMap,
        domain: ContentDomain,
        granularity: Granularity,
        structured_fields: &[String],
        source_text: Option<&str>,
    ) -> ExtractedRecord {
        let schema = self.registry.schema(domain);
        let mut record = ExtractedRecord::new(domain, granularity);

        let mut evidence_texts: IndexMap<String, String> = IndexMap::new();
        let mut confidences: IndexMap<String, f64> = IndexMap::new();
        let mut overall_confidence: Option<f64> = None;

        // Pass 1: peel off the side channels.
        let mut values = FieldMap::new();
        for (key, value) in raw {
            if key == "extraction_confidence" {
                overall_confidence = parse_confidence(&value);
            } else if let Some(base) = key.strip_suffix(EVIDENCE_SUFFIX) {
                if let Value::String(text) = value {
                    evidence_texts.insert(base.to_string(), text);
                }
            } else if let Some(base) = key.strip_suffix(CONFIDENCE_SUFFIX) {
                confidences.insert(
                    base.to_string(),
                    parse_confidence(&value).unwrap_or(DEFAULT_CONFIDENCE),
                );
            } else {
                values.insert(key, value);
            }
        }

        // Pass 2: whitelist and coerce.
        for (name, value) in values {
            let Some(kind) = schema.kind_of(&name) else {
                debug!(field = %name, domain = %domain, "dropping field outside schema");
                continue;
            };

            if is_empty_value(&value) {
                record.fields.insert(name, Value::Null);
                continue;
            }

            let coerced = match coerce_value(&value, kind, &self.currency) {
                Some(coerced) => coerced,
                None => {
                    debug!(field = %name, ?value, "coercion failed, degrading to null");
                    Value::Null
                }
            };

            if is_empty_value(&coerced) {
                // Lists keep their empty-array shape; scalars become null.
                let degraded = if matches!(coerced, Value::Array(_)) {
                    coerced
                } else {
                    Value::Null
                };
                record.fields.insert(name, degraded);
                continue;
            }

            let mut confidence = confidences
                .get(&name)
                .copied()
                .unwrap_or(DEFAULT_CONFIDENCE)
                .clamp(0.0, 1.0);

            let provenance = if structured_fields.contains(&name) {
                confidence = confidences
                    .get(&name)
                    .copied()
                    .unwrap_or(STRUCTURED_CONFIDENCE)
                    .clamp(0.0, 1.0);
                Provenance::StructuredData
            } else if let Some(quote) = evidence_texts.get(&name) {
                let verified = source_text.map(|source| source.contains(quote.trim()));
                if verified == Some(false) {
                    confidence *= UNVERIFIED_EVIDENCE_PENALTY;
                }
                Provenance::Quote {
                    text: quote.clone(),
                    verified,
                }
            } else {
                // Value stated without quotable support.
                Provenance::Inferred
            };

            record.evidence.insert(name.clone(), provenance);
            record.confidence.insert(name.clone(), confidence);
            record.fields.insert(name, coerced);
        }

        apply_aliases(&mut record, schema.aliases);

        record.extraction_confidence = overall_confidence
            .unwrap_or_else(|| mean_confidence(&record))
            .clamp(0.0, 1.0);

        record
    }
}

/// Mirror domain-specific fields onto their generic aliases. Pure copy:
/// the specific field keeps its value, and a populated generic field is
/// never overwritten.
fn apply_aliases(record: &mut ExtractedRecord, aliases: &[(&str, &str)]) {
    for (specific, generic) in aliases {
        if record.is_field_empty(specific) || !record.is_field_empty(generic) {
            continue;
        }
        let value = record.field(specific).clone();
        let provenance = record.evidence.get(*specific).cloned();
        let confidence = record.confidence.get(*specific).copied();

        record.fields.insert((*generic).to_string(), value);
        if let Some(provenance) = provenance {
            record.evidence.insert((*generic).to_string(), provenance);
        }
        if let Some(confidence) = confidence {
            record.confidence.insert((*generic).to_string(), confidence);
        }
    }
}

fn mean_confidence(record: &ExtractedRecord) -> f64 {
    let populated: Vec<f64> = record
        .fields
        .iter()
        .filter(|(_, v)| !is_empty_value(v))
        .filter_map(|(name, _)| record.confidence.get(name).copied())
        .collect();
    if populated.is_empty() {
        return 0.0;
    }
    populated.iter().sum::<f64>() / populated.len() as f64
}

/// Coerce one raw value to its declared kind. `None` on failure.
pub fn coerce_value(value: &Value, kind: FieldKind, currency: &CurrencyConfig) -> Option<Value> {
    match kind {
        FieldKind::Text => coerce_text(value),
        FieldKind::Price => normalize_price(value, currency).map(json_f64),
        FieldKind::Integer => normalize_int(value).map(Value::from),
        FieldKind::Decimal => normalize_decimal(value).map(json_f64),
        FieldKind::Area => normalize_area(value).map(json_f64),
        FieldKind::Date => normalize_date(value).map(Value::String),
        FieldKind::List => Some(Value::Array(
            normalize_list(value).into_iter().map(Value::String).collect(),
        )),
        FieldKind::Flag => normalize_flag(value).map(Value::Bool),
    }
}

fn json_f64(n: f64) -> Value {
    serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn coerce_text(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => Some(Value::String(s.trim().to_string())),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Extract the first decimal number in a string, ignoring thousands
/// separators.
fn leading_number(s: &str) -> Option<f64> {
    let cleaned = s.replace(',', "");
    let re = regex::Regex::new(r"-?\d+(?:\.\d+)?").unwrap();
    re.find(&cleaned)?.as_str().parse().ok()
}

/// Normalize a price to the target currency with two decimals.
///
/// Strings carrying a local-currency marker (symbol or ISO code) are
/// divided by the configured exchange rate; everything else is taken as
/// already being in the target currency.
pub fn normalize_price(value: &Value, currency: &CurrencyConfig) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().map(round2),
        Value::String(s) => {
            let amount = leading_number(s)?;
            let lowered = s.to_lowercase();
            let is_local = currency
                .local_symbols
                .iter()
                .any(|symbol| s.contains(symbol.as_str()))
                || lowered.contains(&currency.local_code.to_lowercase());
            if is_local {
                Some(round2(amount / currency.units_per_usd))
            } else {
                Some(round2(amount))
            }
        }
        _ => None,
    }
}

/// Normalize an integer count.
pub fn normalize_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => leading_number(s).map(|f| f.round() as i64),
        _ => None,
    }
}

fn normalize_decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().map(round2),
        Value::String(s) => leading_number(s).map(round2),
        _ => None,
    }
}

/// Normalize a physical area to square meters.
///
/// Values marked as square meters pass through; everything else
/// (including bare numbers, which listing sites quote in square feet) is
/// converted by [`SQFT_TO_SQM`].
pub fn normalize_area(value: &Value) -> Option<f64> {
    let (amount, text) = match value {
        Value::Number(n) => (n.as_f64()?, String::new()),
        Value::String(s) => (leading_number(s)?, s.to_lowercase()),
        _ => return None,
    };

    let is_metric = ["m²", "m2", "sqm", "sq m", "square met"]
        .iter()
        .any(|marker| text.contains(marker));

    if is_metric {
        Some(round2(amount))
    } else {
        Some(round2(amount * SQFT_TO_SQM))
    }
}

/// Normalize a calendar date to ISO `YYYY-MM-DD`.
pub fn normalize_date(value: &Value) -> Option<String> {
    let Value::String(s) = value else {
        return None;
    };
    let s = s.trim();

    const FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d/%m/%Y",
        "%m/%d/%Y",
        "%B %d, %Y",
        "%d %B %Y",
    ];

    for format in FORMATS {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    None
}

/// Normalize a list field to an array of short strings.
pub fn normalize_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => {
                    let trimmed = s.trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                }
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => {
            let separator = if s.contains(';') { ';' } else { ',' };
            s.split(separator)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        }
        _ => Vec::new(),
    }
}

fn normalize_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "yes" | "true" | "1" => Some(true),
            "no" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parse a confidence value, clamped to [0, 1]. `None` when unparsable.
pub fn parse_confidence(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    Some(parsed.clamp(0.0, 1.0))
}
