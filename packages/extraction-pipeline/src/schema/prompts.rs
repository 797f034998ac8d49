//! Prompt templates for extraction, escalation, classification and
//! enrichment. The extraction templates are composed into a
//! `(domain, granularity)` table once at registry construction.

use std::collections::HashMap;

use crate::types::{ContentDomain, Granularity};

/// System prompt for all schema-constrained extraction calls.
pub const EXTRACT_SYSTEM: &str = "You are a precise data-extraction engine. \
You only output a single JSON object. You never invent values: every field \
you fill must be supported by the supplied content, quoted verbatim in its \
_evidence entry. Use null for anything the content does not state.";

/// Shared body of every extraction template.
const EXTRACT_BASE: &str = r#"Extract the following fields from the page content below.

Allowed fields (use exactly these names, nothing else):
{fields}

{domain_guidance}

{granularity_guidance}

Output rules:
1. Return ONE JSON object. Keys are field names from the allowed list.
2. For every non-null field add "<field>_evidence": the exact source text
   that supports the value, quoted verbatim.
3. For every non-null field add "<field>_confidence": 0.0 to 1.0.
4. Use null for anything the content does not state. Never guess.
5. Monetary values keep their currency marker (symbol or code) in the raw
   string, e.g. "CRC 9,880,000" or "$450".
6. List fields are JSON arrays of short strings.

Page content:
{content}"#;

const PROPERTY_GUIDANCE: &str = "This is a real-estate listing. Capture the asking \
price exactly as written, bedroom/bathroom/parking counts, land and building \
areas with their units, the property type (house, lot, condo...) and amenities.";

const TOUR_GUIDANCE: &str = "This is a tour or activity page. Capture the per-person \
price as written, duration, departure point, what is included and excluded, \
difficulty and any fixed schedule.";

const RESTAURANT_GUIDANCE: &str = "This is a restaurant page. Capture cuisine, price \
tier ($ to $$$$), address, phone, opening hours, signature dishes and whether \
reservations are accepted.";

const TRANSPORT_GUIDANCE: &str = "This is a transportation route or schedule page. \
Capture origin, destination, fare as written, duration, operator, frequency \
and departure times.";

const TRAVEL_TIP_GUIDANCE: &str = "This is travel-advice content. Capture the topic, \
a short summary, the region it applies to, the best season and the concrete \
pieces of advice.";

const SPECIFIC_GUIDANCE: &str = "The page describes ONE item. Extract that item's \
details; ignore cross-links to other items.";

const GENERAL_GUIDANCE: &str = "The page is a guide or listing of MANY items. \
Extract what applies to the collection as a whole (title, region, category, \
summary); leave per-item fields null rather than mixing items together.";

/// The fallback template for domains without a specialized one.
pub fn generic_template() -> String {
    EXTRACT_BASE
        .replace(
            "{domain_guidance}",
            "Extract whatever of the allowed fields the content supports.",
        )
        .replace("{granularity_guidance}", SPECIFIC_GUIDANCE)
}

fn domain_guidance(domain: ContentDomain) -> Option<&'static str> {
    match domain {
        ContentDomain::Property => Some(PROPERTY_GUIDANCE),
        ContentDomain::Tour => Some(TOUR_GUIDANCE),
        ContentDomain::Restaurant => Some(RESTAURANT_GUIDANCE),
        ContentDomain::Transport => Some(TRANSPORT_GUIDANCE),
        ContentDomain::TravelTip => Some(TRAVEL_TIP_GUIDANCE),
        ContentDomain::General => None,
    }
}

/// Build the `(domain, granularity)` extraction-template table.
pub fn build_template_table() -> HashMap<(ContentDomain, Granularity), String> {
    let mut table = HashMap::new();
    for domain in ContentDomain::ALL {
        let Some(guidance) = domain_guidance(domain) else {
            continue;
        };
        for (granularity, gran_guidance) in [
            (Granularity::Specific, SPECIFIC_GUIDANCE),
            (Granularity::General, GENERAL_GUIDANCE),
        ] {
            let template = EXTRACT_BASE
                .replace("{domain_guidance}", guidance)
                .replace("{granularity_guidance}", gran_guidance);
            table.insert((domain, granularity), template);
        }
    }
    table
}

// ---------------------------------------------------------------------------
// Classification prompts
// ---------------------------------------------------------------------------

/// Level-2 granularity check. Answer must be a single unambiguous token.
pub const GRANULARITY_PROMPT: &str = r#"Does this URL (and content, when given) describe a SINGLE item, or a guide/listing/search page covering MANY items?

URL: {url}
{content_section}

Answer with exactly one word: SPECIFIC (single item) or GENERAL (guide or listing)."#;

/// Compact domain classification over a search answer.
pub const DOMAIN_CLASSIFY_PROMPT: &str = r#"Based on this description of a web page, classify the page into exactly one category.

Description:
{answer}

Categories: property_listing, tour, restaurant, transportation, travel_tip, general.

Answer with the single category token, nothing else."#;

// ---------------------------------------------------------------------------
// Escalation prompts
// ---------------------------------------------------------------------------

pub const ESCALATE_SYSTEM: &str = "You fill gaps in a partially-extracted record. \
You only output a single JSON object containing the requested missing fields. \
Infer or derive values from the content and the known fields; return null for \
anything that genuinely cannot be recovered. Never restate fields that are \
already known.";

const ESCALATE_BASE: &str = r#"A record was extracted from a page but some fields are missing.

Known fields:
{known}

Missing fields to infer (return ONLY these, as a JSON object):
{missing}

{family_guidance}

Full page content:
{content}"#;

const PROPERTY_ESCALATE_GUIDANCE: &str = "Real-estate inference rules: derive counts \
from the description text (\"three bedrooms\" -> 3). Derive land or building \
area from any stated dimensions. A price per square meter times an area gives \
a usable price. Property type can be inferred from wording (lot, finca, condo).";

const PROPERTY_ESCALATE_AGGRESSIVE: &str = "Be aggressive: prefer a defensible \
derived value over null. For raw-land listings, room and parking counts are 0, \
not null. If no description exists, compose one sentence from the known fields.";

const DINING_ESCALATE_GUIDANCE: &str = "Dining inference rules: cuisine can be \
inferred from dish names; price tier from menu prices ($ under 10 USD per \
plate, $$ to 20, $$$ to 40, $$$$ above).";

const GENERIC_ESCALATE_GUIDANCE: &str = "Infer conservatively from what the content \
implies; null is better than a guess with no support.";

/// Escalation guidance per domain family. Domains without a specialized
/// block share the generic one.
pub fn escalate_guidance(domain: ContentDomain, aggressive: bool) -> &'static str {
    match (domain, aggressive) {
        (ContentDomain::Property, false) => PROPERTY_ESCALATE_GUIDANCE,
        (ContentDomain::Property, true) => PROPERTY_ESCALATE_AGGRESSIVE,
        (ContentDomain::Restaurant, _) => DINING_ESCALATE_GUIDANCE,
        _ => GENERIC_ESCALATE_GUIDANCE,
    }
}

pub fn format_escalate_prompt(
    known: &str,
    missing: &[&str],
    domain: ContentDomain,
    aggressive: bool,
    content: &str,
) -> String {
    ESCALATE_BASE
        .replace("{known}", known)
        .replace("{missing}", &missing.join(", "))
        .replace("{family_guidance}", escalate_guidance(domain, aggressive))
        .replace("{content}", content)
}

// ---------------------------------------------------------------------------
// Enrichment prompts
// ---------------------------------------------------------------------------

pub const ENRICH_SYSTEM: &str = "You parse a web-search answer into missing record \
fields. Output a single JSON object with ONLY the requested fields. Strict \
value rules: plain text only, no markup and no emoji; numbers as bare \
numerics; currency amounts prefixed with their ISO currency code (e.g. \
\"USD 120\"); arrays as short phrases. Null for anything the answer does not \
support.";

const ENRICH_BASE: &str = r#"A web search about "{subject}" returned this answer:

{answer}

Fill ONLY these still-missing fields as a JSON object:
{missing}"#;

pub fn format_enrich_prompt(subject: &str, answer: &str, missing: &[&str]) -> String {
    ENRICH_BASE
        .replace("{subject}", subject)
        .replace("{answer}", answer)
        .replace("{missing}", &missing.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_table_covers_all_specialized_domains() {
        let table = build_template_table();
        assert_eq!(table.len(), 10); // 5 domains x 2 granularities
        assert!(!table.contains_key(&(ContentDomain::General, Granularity::Specific)));
    }

    #[test]
    fn templates_keep_interpolation_slots() {
        let table = build_template_table();
        for template in table.values() {
            assert!(template.contains("{fields}"));
            assert!(template.contains("{content}"));
            assert!(!template.contains("{domain_guidance}"));
            assert!(!template.contains("{granularity_guidance}"));
        }
        assert!(generic_template().contains("{fields}"));
    }

    #[test]
    fn property_gets_aggressive_guidance_only_when_asked() {
        assert_ne!(
            escalate_guidance(ContentDomain::Property, false),
            escalate_guidance(ContentDomain::Property, true)
        );
        assert_eq!(
            escalate_guidance(ContentDomain::Transport, true),
            GENERIC_ESCALATE_GUIDANCE
        );
    }
}
