//! Level-1 granularity detection from URL path markers.

use crate::types::{Detection, Granularity};

/// Confidence of a path-marker match.
pub const MARKER_CONFIDENCE: f64 = 0.6;

/// Confidence of the no-match default.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Method tag of the no-match default; the cascade uses it to decide
/// whether Level 2 is worth consulting.
pub const DEFAULT_METHOD: &str = "url_path_default";

/// Path substrings that mark a single-item page. Checked first: the
/// singular forms (`/tour/`) would otherwise be shadowed by their plural
/// listing counterparts.
const SPECIFIC_MARKERS: &[&str] = &[
    "/tour/",
    "/property/",
    "/listing/",
    "/restaurant/",
    "/route/",
    "/item/",
    "/detail/",
    "/post/",
    "/p/",
];

/// Path substrings that mark a guide, listing or search page.
const GENERAL_MARKERS: &[&str] = &[
    "/tours/",
    "/properties/",
    "/listings/",
    "/restaurants/",
    "/routes/",
    "/search",
    "/category/",
    "/guide",
    "/blog/",
    "/things-to-do",
    "/top-",
    "/best-",
];

/// Match the URL path against the curated marker tables. First match wins
/// at [`MARKER_CONFIDENCE`]; no match defaults to `Specific` at
/// [`DEFAULT_CONFIDENCE`].
pub fn detect_from_path(url: &str) -> Detection<Granularity> {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());

    if let Some(marker) = SPECIFIC_MARKERS.iter().find(|m| path.contains(*m)) {
        return Detection::new(Granularity::Specific, MARKER_CONFIDENCE, "url_path")
            .with_reasoning(format!("path contains {marker}"));
    }

    if let Some(marker) = GENERAL_MARKERS.iter().find(|m| path.contains(*m)) {
        return Detection::new(Granularity::General, MARKER_CONFIDENCE, "url_path")
            .with_reasoning(format!("path contains {marker}"));
    }

    Detection::new(Granularity::Specific, DEFAULT_CONFIDENCE, DEFAULT_METHOD)
        .with_reasoning("no path marker matched")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_marker_yields_general_at_point_six() {
        let detection = detect_from_path("https://example.com/tours/");
        assert_eq!(detection.value, Granularity::General);
        assert_eq!(detection.confidence, 0.6);
        assert_eq!(detection.method, "url_path");
    }

    #[test]
    fn single_item_marker_yields_specific_at_point_six() {
        let detection = detect_from_path("https://example.com/tour/123-arenal-hike");
        assert_eq!(detection.value, Granularity::Specific);
        assert_eq!(detection.confidence, 0.6);
    }

    #[test]
    fn singular_marker_wins_over_plural_containment() {
        // "/tour/" must not fire on "/tours/" pages.
        let detection = detect_from_path("https://example.com/tours/volcano-day-trips");
        assert_eq!(detection.value, Granularity::General);
    }

    #[test]
    fn no_marker_defaults_to_specific_at_point_five() {
        let detection = detect_from_path("https://example.com/about");
        assert_eq!(detection.value, Granularity::Specific);
        assert_eq!(detection.confidence, 0.5);
        assert_eq!(detection.method, DEFAULT_METHOD);
    }

    #[test]
    fn query_strings_do_not_confuse_the_matcher() {
        let detection = detect_from_path("https://example.com/search?q=/tour/fake");
        assert_eq!(detection.value, Granularity::General);
    }
}
