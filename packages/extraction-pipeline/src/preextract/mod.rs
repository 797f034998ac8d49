//! Structured-data pre-extraction from embedded linked-data blocks.
//!
//! Pages that carry schema.org JSON-LD give us a handful of high-trust
//! values for free. The pre-extractor maps a curated set of those
//! properties onto schema fields. It is purely additive (the merge step
//! only fills fields the model left empty), never emits a field outside
//! the active schema's allowed set, and is deterministic: the same HTML
//! always yields the same map.

use regex::Regex;
use serde_json::Value;

use crate::schema::FieldSchema;
use crate::types::record::{is_empty_value, FieldMap};

/// Parse embedded JSON-LD and map the curated properties onto fields the
/// given schema allows.
pub fn preextract(html: &str, schema: &FieldSchema) -> FieldMap {
    let mut fields = FieldMap::new();

    for block in jsonld_blocks(html) {
        for object in flatten_objects(&block) {
            map_object(&object, schema, &mut fields);
        }
    }

    tracing::debug!(
        domain = %schema.domain,
        field_count = fields.len(),
        "structured-data pre-extraction finished"
    );

    fields
}

/// All parseable JSON-LD payloads in the page, in document order.
fn jsonld_blocks(html: &str) -> Vec<Value> {
    let ld_re =
        Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
            .unwrap();

    ld_re
        .captures_iter(html)
        .filter_map(|cap| serde_json::from_str::<Value>(cap[1].trim()).ok())
        .collect()
}

/// Flatten a JSON-LD payload into its candidate objects: top-level arrays
/// and `@graph` members are walked one level deep.
fn flatten_objects(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.iter().cloned().collect(),
        Value::Object(map) => {
            let mut objects = vec![value.clone()];
            if let Some(Value::Array(graph)) = map.get("@graph") {
                objects.extend(graph.iter().cloned());
            }
            objects
        }
        _ => Vec::new(),
    }
}

/// Curated property mapping. Only fields present in the active schema's
/// allowed set are ever written; first non-empty value per field wins.
fn map_object(object: &Value, schema: &FieldSchema, fields: &mut FieldMap) {
    let Value::Object(map) = object else {
        return;
    };

    if let Some(rating) = map.get("aggregateRating") {
        set(fields, schema, "rating", rating.get("ratingValue").cloned());
        set(
            fields,
            schema,
            "review_count",
            rating
                .get("reviewCount")
                .or_else(|| rating.get("ratingCount"))
                .cloned(),
        );
    }

    set(fields, schema, "phone", map.get("telephone").cloned());
    set(fields, schema, "cuisine", join_strings(map.get("servesCuisine")));
    set(fields, schema, "location", format_address(map.get("address")));
    set(fields, schema, "price_tier", map.get("priceRange").cloned());
    set(
        fields,
        schema,
        "reservations",
        map.get("acceptsReservations").cloned(),
    );
}

fn set(fields: &mut FieldMap, schema: &FieldSchema, name: &str, value: Option<Value>) {
    let Some(value) = value else {
        return;
    };
    if is_empty_value(&value) || !schema.is_allowed(name) {
        return;
    }
    if fields.get(name).map(is_empty_value).unwrap_or(true) {
        fields.insert(name.to_string(), value);
    }
}

/// `servesCuisine` is a string or an array of strings.
fn join_strings(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::String(s) => Some(Value::String(s.clone())),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            (!joined.is_empty()).then(|| Value::String(joined))
        }
        _ => None,
    }
}

/// `address` is a plain string or a PostalAddress object.
fn format_address(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::String(s) => Some(Value::String(s.clone())),
        Value::Object(map) => {
            let parts: Vec<&str> = ["streetAddress", "addressLocality", "addressRegion", "addressCountry"]
                .iter()
                .filter_map(|key| map.get(*key).and_then(|v| v.as_str()))
                .collect();
            (!parts.is_empty()).then(|| Value::String(parts.join(", ")))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use crate::types::ContentDomain;
    use serde_json::json;

    const RESTAURANT_HTML: &str = r#"<html><body>
        <script type="application/ld+json">
        {
            "@context": "https://schema.org",
            "@type": "Restaurant",
            "name": "Soda La Selva",
            "telephone": "+506 2222 3333",
            "servesCuisine": ["Costa Rican", "Seafood"],
            "priceRange": "$$",
            "acceptsReservations": true,
            "address": {
                "@type": "PostalAddress",
                "streetAddress": "Calle 5",
                "addressLocality": "Quepos",
                "addressCountry": "CR"
            },
            "aggregateRating": {"ratingValue": 4.6, "reviewCount": 182}
        }
        </script>
    </body></html>"#;

    #[test]
    fn maps_curated_properties_for_restaurants() {
        let registry = SchemaRegistry::new();
        let schema = registry.schema(ContentDomain::Restaurant);
        let fields = preextract(RESTAURANT_HTML, schema);

        assert_eq!(fields.get("rating"), Some(&json!(4.6)));
        assert_eq!(fields.get("review_count"), Some(&json!(182)));
        assert_eq!(fields.get("phone"), Some(&json!("+506 2222 3333")));
        assert_eq!(fields.get("cuisine"), Some(&json!("Costa Rican, Seafood")));
        assert_eq!(fields.get("price_tier"), Some(&json!("$$")));
        assert_eq!(fields.get("reservations"), Some(&json!(true)));
        assert_eq!(fields.get("location"), Some(&json!("Calle 5, Quepos, CR")));
    }

    #[test]
    fn never_emits_fields_outside_the_active_schema() {
        let registry = SchemaRegistry::new();
        // Tour schema has no cuisine/price_tier/reservations fields.
        let schema = registry.schema(ContentDomain::Tour);
        let fields = preextract(RESTAURANT_HTML, schema);

        assert!(!fields.contains_key("cuisine"));
        assert!(!fields.contains_key("price_tier"));
        assert!(!fields.contains_key("reservations"));
        // rating/review_count/phone/location are generic, still allowed
        assert!(fields.contains_key("rating"));
    }

    #[test]
    fn is_idempotent_across_repeated_calls() {
        let registry = SchemaRegistry::new();
        let schema = registry.schema(ContentDomain::Restaurant);
        let first = preextract(RESTAURANT_HTML, schema);
        let second = preextract(RESTAURANT_HTML, schema);
        assert_eq!(first, second);
    }

    #[test]
    fn handles_graph_wrappers_and_ignores_broken_json() {
        let html = r#"
            <script type="application/ld+json">not json at all</script>
            <script type="application/ld+json">
            {"@graph": [{"@type": "Restaurant", "telephone": "+506 1111 2222"}]}
            </script>
        "#;
        let registry = SchemaRegistry::new();
        let schema = registry.schema(ContentDomain::Restaurant);
        let fields = preextract(html, schema);
        assert_eq!(fields.get("phone"), Some(&json!("+506 1111 2222")));
    }

    #[test]
    fn pages_without_structured_data_yield_nothing() {
        let registry = SchemaRegistry::new();
        let schema = registry.schema(ContentDomain::Restaurant);
        assert!(preextract("<html><body><p>plain</p></body></html>", schema).is_empty());
    }
}
