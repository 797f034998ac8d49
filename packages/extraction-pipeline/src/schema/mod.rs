//! Per-domain field schemas and prompt-template dispatch.
//!
//! The registry is built once at startup. Lookups fail closed: an unknown
//! domain resolves to a default schema with an empty domain-specific field
//! list, and a missing `(domain, granularity)` template resolves to the
//! generic template. Nothing in this module ever panics on a miss.

pub mod prompts;

use std::collections::HashMap;

use crate::types::{ContentDomain, Granularity};

/// How a field's raw value is normalized by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,

    /// Monetary amount, normalized to the target currency with 2 decimals.
    Price,

    /// Whole-number count.
    Integer,

    /// Plain decimal (ratings, durations).
    Decimal,

    /// Physical area, normalized to square meters.
    Area,

    /// Calendar date, normalized to ISO `YYYY-MM-DD`.
    Date,

    /// Array of short strings.
    List,

    /// Yes/no flag.
    Flag,
}

/// One allowed field and its normalization kind.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// Generic fields shared by every domain.
pub const GENERIC_FIELDS: &[FieldSpec] = &[
    field("name", FieldKind::Text),
    field("description", FieldKind::Text),
    field("location", FieldKind::Text),
    field("price", FieldKind::Price),
    field("images", FieldKind::List),
    field("rating", FieldKind::Decimal),
    field("review_count", FieldKind::Integer),
    field("phone", FieldKind::Text),
    field("website", FieldKind::Text),
    field("category", FieldKind::Text),
];

/// The field schema for one content domain.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub domain: ContentDomain,

    /// Domain-specific allowed fields, on top of [`GENERIC_FIELDS`].
    pub specific: &'static [FieldSpec],

    /// Fields whose absence triggers escalation or enrichment.
    pub critical: &'static [&'static str],

    /// Fields the escalator may ask the model to infer.
    pub inferable: &'static [&'static str],

    /// `(specific_field, generic_field)` pairs mirrored by copy after
    /// validation. Never a rename.
    pub aliases: &'static [(&'static str, &'static str)],
}

impl FieldSchema {
    /// All allowed fields: generic then domain-specific.
    pub fn allowed(&self) -> impl Iterator<Item = &FieldSpec> {
        GENERIC_FIELDS.iter().chain(self.specific.iter())
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed().any(|f| f.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.allowed().find(|f| f.name == name).map(|f| f.kind)
    }

    /// Critical fields the escalator is allowed to infer.
    pub fn inferable_critical(&self) -> Vec<&'static str> {
        self.critical
            .iter()
            .copied()
            .filter(|name| self.inferable.contains(name))
            .collect()
    }

    /// Comma-separated field list for prompt interpolation.
    pub fn prompt_field_list(&self) -> String {
        self.allowed()
            .map(|f| f.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

const PROPERTY_FIELDS: &[FieldSpec] = &[
    field("property_title", FieldKind::Text),
    field("property_type", FieldKind::Text),
    field("bedrooms", FieldKind::Integer),
    field("bathrooms", FieldKind::Integer),
    field("parking_spaces", FieldKind::Integer),
    field("land_area_sqm", FieldKind::Area),
    field("building_area_sqm", FieldKind::Area),
    field("amenities", FieldKind::List),
    field("listing_date", FieldKind::Date),
];

const TOUR_FIELDS: &[FieldSpec] = &[
    field("tour_name", FieldKind::Text),
    field("duration_hours", FieldKind::Decimal),
    field("price_per_person", FieldKind::Price),
    field("departure_point", FieldKind::Text),
    field("included", FieldKind::List),
    field("excluded", FieldKind::List),
    field("difficulty", FieldKind::Text),
    field("schedule", FieldKind::List),
    field("group_size_max", FieldKind::Integer),
];

const RESTAURANT_FIELDS: &[FieldSpec] = &[
    field("restaurant_name", FieldKind::Text),
    field("cuisine", FieldKind::Text),
    field("price_tier", FieldKind::Text),
    field("address", FieldKind::Text),
    field("opening_hours", FieldKind::List),
    field("menu_highlights", FieldKind::List),
    field("reservations", FieldKind::Flag),
];

const TRANSPORT_FIELDS: &[FieldSpec] = &[
    field("route_name", FieldKind::Text),
    field("origin", FieldKind::Text),
    field("destination", FieldKind::Text),
    field("duration_minutes", FieldKind::Integer),
    field("fare", FieldKind::Price),
    field("operator", FieldKind::Text),
    field("frequency", FieldKind::Text),
    field("departures", FieldKind::List),
];

const TRAVEL_TIP_FIELDS: &[FieldSpec] = &[
    field("tip_title", FieldKind::Text),
    field("summary", FieldKind::Text),
    field("region", FieldKind::Text),
    field("best_season", FieldKind::Text),
    field("topics", FieldKind::List),
    field("advice", FieldKind::List),
];

const NO_FIELDS: &[FieldSpec] = &[];
const NO_NAMES: &[&str] = &[];
const NO_ALIASES: &[(&str, &str)] = &[];

/// Registry of schemas and prompt templates, built once and shared.
pub struct SchemaRegistry {
    schemas: HashMap<ContentDomain, FieldSchema>,
    default_schema: FieldSchema,
    templates: HashMap<(ContentDomain, Granularity), String>,
    default_template: String,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        let mut schemas = HashMap::new();

        schemas.insert(
            ContentDomain::Property,
            FieldSchema {
                domain: ContentDomain::Property,
                specific: PROPERTY_FIELDS,
                critical: &["name", "price", "location", "bedrooms", "land_area_sqm"],
                inferable: &[
                    "bedrooms",
                    "bathrooms",
                    "parking_spaces",
                    "property_type",
                    "description",
                    "land_area_sqm",
                ],
                aliases: &[("property_title", "name")],
            },
        );

        schemas.insert(
            ContentDomain::Tour,
            FieldSchema {
                domain: ContentDomain::Tour,
                specific: TOUR_FIELDS,
                critical: &["name", "price", "duration_hours", "location"],
                inferable: &["duration_hours", "difficulty", "included", "description", "price"],
                aliases: &[("tour_name", "name"), ("price_per_person", "price")],
            },
        );

        schemas.insert(
            ContentDomain::Restaurant,
            FieldSchema {
                domain: ContentDomain::Restaurant,
                specific: RESTAURANT_FIELDS,
                critical: &["name", "cuisine", "location", "phone"],
                inferable: &["cuisine", "price_tier", "category", "description"],
                aliases: &[("restaurant_name", "name"), ("address", "location")],
            },
        );

        schemas.insert(
            ContentDomain::Transport,
            FieldSchema {
                domain: ContentDomain::Transport,
                specific: TRANSPORT_FIELDS,
                critical: &["name", "origin", "destination", "fare"],
                inferable: &["duration_minutes", "frequency", "operator", "description"],
                aliases: &[("route_name", "name")],
            },
        );

        schemas.insert(
            ContentDomain::TravelTip,
            FieldSchema {
                domain: ContentDomain::TravelTip,
                specific: TRAVEL_TIP_FIELDS,
                critical: &["name", "summary"],
                inferable: &["summary", "topics", "region", "description"],
                aliases: &[("tip_title", "name"), ("summary", "description")],
            },
        );

        let default_schema = FieldSchema {
            domain: ContentDomain::General,
            specific: NO_FIELDS,
            critical: NO_NAMES,
            inferable: NO_NAMES,
            aliases: NO_ALIASES,
        };

        let templates = prompts::build_template_table();
        let default_template = prompts::generic_template();

        Self {
            schemas,
            default_schema,
            templates,
            default_template,
        }
    }

    /// Schema for a domain. Unknown domains fail closed to the default
    /// schema (generic fields only, nothing critical).
    pub fn schema(&self, domain: ContentDomain) -> &FieldSchema {
        self.schemas.get(&domain).unwrap_or(&self.default_schema)
    }

    /// Extraction prompt template for `(domain, granularity)`, or the
    /// generic template on a miss.
    pub fn template(&self, domain: ContentDomain, granularity: Granularity) -> &str {
        self.templates
            .get(&(domain, granularity))
            .unwrap_or(&self.default_template)
            .as_str()
    }
}
