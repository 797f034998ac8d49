//! Classification tags and results.

use serde::{Deserialize, Serialize};

/// The content vertical a page belongs to. Closed set; anything the
/// classifier cannot place lands in [`ContentDomain::General`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentDomain {
    /// Real-estate listing (sale or rental).
    Property,

    /// Guided tour or activity.
    Tour,

    /// Restaurant or food venue.
    Restaurant,

    /// Transportation route, schedule or operator.
    Transport,

    /// Travel advice / tip content.
    TravelTip,

    /// Fallback for everything else.
    General,
}

impl ContentDomain {
    /// All classifiable domains, in classifier-enum order.
    pub const ALL: [ContentDomain; 6] = [
        ContentDomain::Property,
        ContentDomain::Tour,
        ContentDomain::Restaurant,
        ContentDomain::Transport,
        ContentDomain::TravelTip,
        ContentDomain::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentDomain::Property => "property",
            ContentDomain::Tour => "tour",
            ContentDomain::Restaurant => "restaurant",
            ContentDomain::Transport => "transport",
            ContentDomain::TravelTip => "travel_tip",
            ContentDomain::General => "general",
        }
    }

    /// Parse a loosely-formatted tag, as models and config files write it.
    pub fn parse_loose(s: &str) -> Option<ContentDomain> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "property" | "property_listing" | "real_estate" | "listing" => {
                Some(ContentDomain::Property)
            }
            "tour" | "tours" | "activity" | "excursion" => Some(ContentDomain::Tour),
            "restaurant" | "dining" | "food" => Some(ContentDomain::Restaurant),
            "transport" | "transportation" | "transit" | "route" => Some(ContentDomain::Transport),
            "travel_tip" | "tip" | "tips" | "guide" | "advice" => Some(ContentDomain::TravelTip),
            "general" | "unknown" | "other" => Some(ContentDomain::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a page describes one item or a guide/listing of many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One item (a single tour, a single listing).
    Specific,

    /// A guide, search page or listing of many items.
    General,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Specific => "specific",
            Granularity::General => "general",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detector's answer within a cascade.
#[derive(Debug, Clone)]
pub struct Detection<T> {
    pub value: T,
    pub confidence: f64,
    pub method: &'static str,
    pub reasoning: String,
}

impl<T> Detection<T> {
    pub fn new(value: T, confidence: f64, method: &'static str) -> Self {
        Self {
            value,
            confidence,
            method,
            reasoning: String::new(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}

/// Combined classification of one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub domain: ContentDomain,
    pub granularity: Granularity,

    /// Combined confidence, the weaker of the two cascades. In [0, 1].
    pub confidence: f64,

    /// Which detectors produced the result, e.g. `"keyword+url_path"`.
    pub method: String,

    pub reasoning: String,
}

impl Classification {
    pub fn from_detections(
        domain: Detection<ContentDomain>,
        granularity: Detection<Granularity>,
    ) -> Self {
        Self {
            domain: domain.value,
            granularity: granularity.value,
            confidence: domain.confidence.min(granularity.confidence),
            method: format!("{}+{}", domain.method, granularity.method),
            reasoning: match (domain.reasoning.is_empty(), granularity.reasoning.is_empty()) {
                (true, true) => String::new(),
                (false, true) => domain.reasoning,
                (true, false) => granularity.reasoning,
                (false, false) => format!("{}; {}", domain.reasoning, granularity.reasoning),
            },
        }
    }
}
