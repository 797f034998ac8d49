//! Content cleaning: reduce a page to the fragments worth sending to a
//! model, plus the small HTML helpers shared by the fetch tiers.
//!
//! Cleaning keeps headings, keyword-flagged sections, embedded structured
//! data, inline-script JSON, list items, table rows and the first
//! paragraphs. Pages too sparse for fragment extraction fall back to the
//! full tag-stripped text. Everything here is deterministic.

use regex::Regex;
use url::Url;

/// Limits for content cleaning.
#[derive(Debug, Clone)]
pub struct CleanConfig {
    /// Cap on the combined cleaned text. A truncation marker is appended
    /// when the cap is hit.
    pub max_chars: usize,

    /// Below this fragment count, fall back to the full page text.
    pub min_fragments: usize,

    /// How many leading paragraphs to keep.
    pub max_paragraphs: usize,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            max_chars: 50_000,
            min_fragments: 10,
            max_paragraphs: 20,
        }
    }
}

/// Marker appended when cleaned content hits the length cap.
pub const TRUNCATION_MARKER: &str = "\n[content truncated]";

/// Cleaned page content ready for extraction.
#[derive(Debug, Clone)]
pub struct CleanedContent {
    pub text: String,
    pub fragment_count: usize,
    pub truncated: bool,
    /// Whether fragment extraction was abandoned for full-text fallback.
    pub used_fallback: bool,
}

/// Reduce HTML to semantic fragments for the extraction prompt.
pub fn clean_for_extraction(html: &str, config: &CleanConfig) -> CleanedContent {
    let mut fragments: Vec<String> = Vec::new();

    let heading_re = Regex::new(r"(?is)<h[1-4][^>]*>(.*?)</h[1-4]>").unwrap();
    for cap in heading_re.captures_iter(html) {
        push_fragment(&mut fragments, strip_tags(&cap[1]));
    }

    // Sections whose class/id names flag detail-bearing blocks.
    let section_re = Regex::new(
        r#"(?is)<(?:div|section|span)[^>]*(?:class|id)\s*=\s*["'][^"']*(?:detail|price|schedule|feature|amenit|spec)[^"']*["'][^>]*>(.*?)</(?:div|section|span)>"#,
    )
    .unwrap();
    for cap in section_re.captures_iter(html) {
        push_fragment(&mut fragments, strip_tags(&cap[1]));
    }

    // Embedded structured-data blocks, kept raw for the model.
    let ld_re =
        Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
            .unwrap();
    for cap in ld_re.captures_iter(html) {
        push_fragment(&mut fragments, cap[1].trim().to_string());
    }

    // JSON object literals inside inline scripts that mention data keys.
    let script_re = Regex::new(r"(?is)<script(\s[^>]*)?>(.*?)</script>").unwrap();
    let json_re =
        Regex::new(r#"\{[^{}]*"(?:price|name|rating|address|currency)"[^{}]*\}"#).unwrap();
    for cap in script_re.captures_iter(html) {
        let attrs = cap.get(1).map(|m| m.as_str()).unwrap_or("");
        if attrs.contains("ld+json") {
            continue;
        }
        for json_cap in json_re.find_iter(&cap[2]) {
            push_fragment(&mut fragments, json_cap.as_str().trim().to_string());
        }
    }

    let li_re = Regex::new(r"(?is)<li[^>]*>(.*?)</li>").unwrap();
    for cap in li_re.captures_iter(html) {
        push_fragment(&mut fragments, strip_tags(&cap[1]));
    }

    let tr_re = Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap();
    for cap in tr_re.captures_iter(html) {
        push_fragment(&mut fragments, strip_tags(&cap[1]));
    }

    let p_re = Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap();
    for cap in p_re.captures_iter(html).take(config.max_paragraphs) {
        push_fragment(&mut fragments, strip_tags(&cap[1]));
    }

    let fragment_count = fragments.len();
    let (mut text, used_fallback) = if fragment_count < config.min_fragments {
        tracing::debug!(
            fragment_count,
            min = config.min_fragments,
            "too few fragments, falling back to full page text"
        );
        (html_to_text(html), true)
    } else {
        (fragments.join("\n"), false)
    };

    let truncated = text.chars().count() > config.max_chars;
    if truncated {
        text = text.chars().take(config.max_chars).collect();
        text.push_str(TRUNCATION_MARKER);
    }

    CleanedContent {
        text,
        fragment_count,
        truncated,
        used_fallback,
    }
}

fn push_fragment(fragments: &mut Vec<String>, fragment: String) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        fragments.push(trimmed.to_string());
    }
}

/// Strip all tags and decode the common entities.
pub fn strip_tags(html: &str) -> String {
    let tag_re = Regex::new(r"<[^>]+>").unwrap();
    let text = tag_re.replace_all(html, " ");
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce a full HTML document to plain text.
pub fn html_to_text(html: &str) -> String {
    let script_re = Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    let style_re = Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    let block_re = Regex::new(r"(?i)</(?:p|div|section|li|tr|h[1-6])>|<br\s*/?>").unwrap();

    let text = script_re.replace_all(html, "");
    let text = style_re.replace_all(&text, "");
    let text = block_re.replace_all(&text, "\n");

    let tag_re = Regex::new(r"<[^>]+>").unwrap();
    let text = tag_re.replace_all(&text, " ");
    let text = decode_entities(&text);

    let multi_newline = Regex::new(r"\n\s*\n+").unwrap();
    let collapsed = multi_newline.replace_all(&text, "\n");

    collapsed
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Extract the page title.
pub fn extract_title(html: &str) -> Option<String> {
    let title_re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap();
    title_re
        .captures(html)
        .map(|cap| strip_tags(&cap[1]))
        .filter(|t| !t.is_empty())
}

/// Collect up to `limit` image URLs, resolved against the page URL.
pub fn extract_image_urls(html: &str, base_url: &str, limit: usize) -> Vec<String> {
    let img_re = Regex::new(r#"(?i)<img[^>]+src\s*=\s*["']([^"']+)["']"#).unwrap();
    let base = Url::parse(base_url).ok();

    let mut urls = Vec::new();
    for cap in img_re.captures_iter(html) {
        let src = cap[1].trim();
        if src.starts_with("data:") {
            continue;
        }
        let resolved = match &base {
            Some(base) => match base.join(src) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            },
            None => src.to_string(),
        };
        if !urls.contains(&resolved) {
            urls.push(resolved);
        }
        if urls.len() >= limit {
            break;
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    const RICH_HTML: &str = r#"<html><head><title>Villa Oro - For Sale</title></head><body>
        <h1>Villa Oro</h1>
        <div class="price-box">CRC 9,880,000</div>
        <div class="details">3 bedrooms, 2 bathrooms</div>
        <script type="application/ld+json">{"@type":"Product","name":"Villa Oro"}</script>
        <ul><li>Pool</li><li>Garden</li><li>Garage</li></ul>
        <table><tr><td>Land</td><td>1500 sq ft</td></tr></table>
        <p>A bright villa close to the beach.</p>
        <p>Recently renovated.</p>
        <p>Quiet street.</p>
    </body></html>"#;

    #[test]
    fn cleaning_keeps_semantic_fragments() {
        let cleaned = clean_for_extraction(RICH_HTML, &CleanConfig::default());
        assert!(cleaned.fragment_count >= 10);
        assert!(!cleaned.used_fallback);
        assert!(cleaned.text.contains("Villa Oro"));
        assert!(cleaned.text.contains("CRC 9,880,000"));
        assert!(cleaned.text.contains("Pool"));
        assert!(cleaned.text.contains(r#""@type":"Product""#));
    }

    #[test]
    fn sparse_pages_fall_back_to_full_text() {
        let html = "<html><body><p>Just one line.</p></body></html>";
        let cleaned = clean_for_extraction(html, &CleanConfig::default());
        assert!(cleaned.used_fallback);
        assert!(cleaned.text.contains("Just one line."));
    }

    #[test]
    fn long_content_is_capped_with_marker() {
        let body: String = (0..500)
            .map(|i| format!("<li>amenity number {i} with some padding text</li>"))
            .collect();
        let html = format!("<html><body><ul>{body}</ul></body></html>");
        let config = CleanConfig {
            max_chars: 1_000,
            ..CleanConfig::default()
        };
        let cleaned = clean_for_extraction(&html, &config);
        assert!(cleaned.truncated);
        assert!(cleaned.text.ends_with(TRUNCATION_MARKER));
        assert!(cleaned.text.chars().count() <= 1_000 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn html_to_text_strips_scripts_and_tags() {
        let html = "<html><script>tracker();</script><body><h1>Title</h1><p>Hello &amp; world</p></body></html>";
        let text = html_to_text(html);
        assert!(text.contains("Title"));
        assert!(text.contains("Hello & world"));
        assert!(!text.contains("tracker"));
    }

    #[test]
    fn image_urls_are_resolved_and_deduplicated() {
        let html = r#"<img src="/a.jpg"><img src="/a.jpg"><img src="https://cdn.example.com/b.png"><img src="data:image/png;base64,xyz">"#;
        let urls = extract_image_urls(html, "https://example.com/page", 10);
        assert_eq!(
            urls,
            vec![
                "https://example.com/a.jpg".to_string(),
                "https://cdn.example.com/b.png".to_string(),
            ]
        );
    }

    #[test]
    fn title_extraction() {
        assert_eq!(
            extract_title(RICH_HTML).as_deref(),
            Some("Villa Oro - For Sale")
        );
        assert_eq!(extract_title("<html><body></body></html>"), None);
    }
}
