//! Keyword-table domain detection from the URL alone.

use crate::types::{ContentDomain, Detection};

/// Confidence of a host/keyword table match.
pub const KEYWORD_CONFIDENCE: f64 = 0.9;

/// Host and path keywords per domain. Order matters: the first matching
/// entry wins, and more specific markers sit above generic ones.
const KEYWORD_TABLE: &[(&str, ContentDomain)] = &[
    // Hosts
    ("encuentra24", ContentDomain::Property),
    ("remax", ContentDomain::Property),
    ("zillow", ContentDomain::Property),
    ("realtor.", ContentDomain::Property),
    ("viator", ContentDomain::Tour),
    ("getyourguide", ContentDomain::Tour),
    ("opentable", ContentDomain::Restaurant),
    ("yelp.", ContentDomain::Restaurant),
    ("rome2rio", ContentDomain::Transport),
    ("thebusschedule", ContentDomain::Transport),
    // Path keywords
    ("real-estate", ContentDomain::Property),
    ("property", ContentDomain::Property),
    ("listing", ContentDomain::Property),
    ("for-sale", ContentDomain::Property),
    ("tour", ContentDomain::Tour),
    ("excursion", ContentDomain::Tour),
    ("activity", ContentDomain::Tour),
    ("restaurant", ContentDomain::Restaurant),
    ("dining", ContentDomain::Restaurant),
    ("menu", ContentDomain::Restaurant),
    ("bus-", ContentDomain::Transport),
    ("ferry", ContentDomain::Transport),
    ("shuttle", ContentDomain::Transport),
    ("transport", ContentDomain::Transport),
    ("travel-tips", ContentDomain::TravelTip),
    ("travel-guide", ContentDomain::TravelTip),
    ("tips", ContentDomain::TravelTip),
];

/// Match the URL against the keyword table. Declines (returns `None`)
/// when nothing matches, handing the cascade to the search-backed step.
pub fn detect_from_url(url: &str) -> Option<Detection<ContentDomain>> {
    let lowered = url.to_lowercase();
    KEYWORD_TABLE
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(keyword, domain)| {
            Detection::new(*domain, KEYWORD_CONFIDENCE, "keyword")
                .with_reasoning(format!("url contains {keyword}"))
        })
}
