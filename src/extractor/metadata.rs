use crate::node_utils::NodeExt;
use crate::parser::NodeRef;
use crate::perf::{Span, SpanLog};
use crate::utils::*;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

// `name` holds a single value, optionally twitter-prefixed.
static META_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(twitter)\s*:\s*)?(description|title)\s*$").unwrap()
});
// `property` is only consulted for the Open Graph namespace.
static META_PROPERTY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*og\s*:\s*(description|title)\s*$").unwrap());

static TITLE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" [\|\-\\/>»] ").unwrap());
static TITLE_HIERARCHICAL_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" [\\/>»] ").unwrap());
static TITLE_CUT_FINAL_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.*)[\|\-\\/>»] .*").unwrap());
static TITLE_CUT_FIRST_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\|\-\\/>»]*[\|\-\\/>»](.*)").unwrap());
static TITLE_ANY_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\|\-\\/>»]+").unwrap());

/// Representative-image fallback chain, probed in order; the first
/// non-empty attribute wins.
const IMAGE_SOURCES: &[(&str, &str)] = &[
    (r#"head meta[property="og:image:secure_url"]"#, "content"),
    (r#"head meta[property="og:image:url"]"#, "content"),
    (r#"head meta[property="og:image"]"#, "content"),
    (r#"meta[name="twitter:image"]"#, "content"),
    (r#"link[rel="image_src"]"#, "href"),
    (r#"meta[name="thumbnail"]"#, "content"),
];

/// Metadata recovered from `<meta>` / `<link>` tags and the title
/// heuristics.
pub struct Metadata {
    pub title: String,
    pub byline: String,
    pub excerpt: String,
    pub favicon_url: String,
    pub image_url: String,
}

/// Scan the document head for description / title / author metadata and
/// derive the favicon and representative-image URLs.
pub fn collect_metadata(doc: &NodeRef, base: &Url, trace: &SpanLog) -> Metadata {
    span_begin!(trace, Span::CollectMetadata);

    let mut values: HashMap<String, String> = HashMap::new();
    let mut byline = String::new();

    for meta in select_descendants(doc, "meta") {
        let name = meta.attr_value("name");
        let property = meta.attr_value("property");
        let content = match meta.attr_value("content") {
            Some(content) => content,
            None => continue,
        };

        if let Some(name) = name.as_deref() {
            if META_NAME_PATTERN.is_match(name) {
                values.insert(normalize_meta_key(name), content.trim().to_string());
            }
        }
        if let Some(property) = property.as_deref() {
            if META_PROPERTY_PATTERN.is_match(property) {
                values.insert(normalize_meta_key(property), content.trim().to_string());
            }
        }
        if name.as_deref() == Some("author") || property.as_deref() == Some("author") {
            byline = content.trim().to_string();
        }
    }

    span_mark!(trace, Span::CollectMetadata, "meta_tags_scanned");

    let mut title = get_article_title(doc);
    if title.is_empty() {
        title = values
            .get("og:title")
            .or_else(|| values.get("twitter:title"))
            .cloned()
            .unwrap_or_default();
    }

    let excerpt = values
        .get("og:description")
        .or_else(|| values.get("twitter:description"))
        .or_else(|| values.get("description"))
        .cloned()
        .unwrap_or_default();

    let favicon_url = get_favicon_url(doc, base);
    let image_url = get_image_url(doc, base);

    span_end!(trace, Span::CollectMetadata);

    Metadata {
        title,
        byline,
        excerpt,
        favicon_url,
        image_url,
    }
}

/// Lowercase a meta key and drop all embedded whitespace, so that
/// `" og : title "` and `"og:title"` collide.
fn normalize_meta_key(raw: &str) -> String {
    raw.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}

/// Derive the article title from the `<title>` element.
///
/// Site names glued on with ` | `, ` - `, ` » ` and friends are cut off;
/// a `"Site: headline"` pattern falls back to the part after the colon
/// unless a heading carries the full string; degenerate lengths fall
/// back to a lone `<h1>`. Over-shortened results revert to the original
/// title.
pub fn get_article_title(doc: &NodeRef) -> String {
    let orig_title = doc
        .select_first("title")
        .map(|t| t.as_node().text_contents().trim().to_string())
        .unwrap_or_default();
    let mut cur_title = orig_title.clone();
    let mut had_hierarchical_separators = false;

    if TITLE_SEPARATOR.is_match(&cur_title) {
        had_hierarchical_separators = TITLE_HIERARCHICAL_SEPARATOR.is_match(&cur_title);
        cur_title = TITLE_CUT_FINAL_PART.replace(&orig_title, "$1").to_string();
        if word_count(&cur_title) < 3 {
            cur_title = TITLE_CUT_FIRST_PART.replace(&orig_title, "$1").to_string();
        }
    } else if cur_title.contains(": ") {
        // A heading carrying the exact string means the colon belongs to
        // the headline itself.
        let heading_matches = test_any_node_by_selector(doc, "h1", |node| {
            node.text_contents().trim() == cur_title
        }) || test_any_node_by_selector(doc, "h2", |node| {
            node.text_contents().trim() == cur_title
        });

        if !heading_matches {
            if let Some(pos) = orig_title.rfind(':') {
                cur_title = orig_title[pos + 1..].to_string();
            }
            if word_count(&cur_title) < 3 {
                if let Some(pos) = orig_title.find(':') {
                    cur_title = orig_title[pos + 1..].to_string();
                }
            }
        }
    } else if cur_title.chars().count() > 150 || cur_title.chars().count() < 15 {
        let h_ones = select_descendants(doc, "h1");
        if h_ones.len() == 1 {
            cur_title = h_ones[0].text_contents().trim().to_string();
        }
    }

    cur_title = cur_title.trim().to_string();

    // Titles of four words or fewer are suspicious: unless the original
    // used hierarchical separators and exactly one segment was removed,
    // assume over-shortening and revert.
    let cur_word_count = word_count(&cur_title) as i64;
    if cur_word_count <= 4 {
        let separators_stripped = TITLE_ANY_SEPARATOR.replace_all(&orig_title, "").to_string();
        if !had_hierarchical_separators
            || word_count(&separators_stripped) as i64 - 1 != cur_word_count
        {
            cur_title = orig_title;
        }
    }

    cur_title.trim().to_string()
}

fn get_favicon_url(doc: &NodeRef, base: &Url) -> String {
    let mut favicon = doc
        .select_first(r#"head link[rel="shortcut icon"]"#)
        .ok()
        .and_then(|link| link.as_node().attr_value("href"))
        .unwrap_or_default();
    if favicon.is_empty() {
        favicon = doc
            .select_first(r#"head link[rel="icon"]"#)
            .ok()
            .and_then(|link| link.as_node().attr_value("href"))
            .unwrap_or_default();
    }
    if favicon.is_empty() {
        return favicon;
    }
    absolutize_uri(&favicon, base)
}

fn get_image_url(doc: &NodeRef, base: &Url) -> String {
    for (selector, attr) in IMAGE_SOURCES {
        if let Ok(found) = doc.select_first(selector) {
            if let Some(value) = found.as_node().attr_value(attr) {
                if !value.trim().is_empty() {
                    return absolutize_uri(&value, base);
                }
            }
        }
    }
    String::new()
}
