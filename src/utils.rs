use crate::models::ExtractionFlags;
use crate::node_utils::NodeExt;
use crate::parser::NodeRef;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Class / id tokens that suggest a node is *content* (article body, blog
/// post, etc.).
pub static POSITIVE_HINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story").unwrap()
});

/// Class / id tokens that suggest a node is *non-content* (ads, sidebars,
/// navigation, footers, etc.).
pub static NEGATIVE_HINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|footer|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|widget").unwrap()
});

/// Class / id tokens that mark a subtree as unlikely to hold article
/// content. Matching nodes are removed when the strip-unlikelys flag is
/// active, unless [`OK_MAYBE_ITS_A_CANDIDATE`] also matches.
pub static UNLIKELY_CANDIDATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote").unwrap()
});

/// Escape hatch for [`UNLIKELY_CANDIDATES`].
pub static OK_MAYBE_ITS_A_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)and|article|body|column|content|main|mathjax|shadow").unwrap());

/// Class / id tokens that identify a byline block.
pub static BYLINE_HINTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)byline|author|dateline|writtenby|p-author").unwrap());

/// Embed hosts whose `<object>` / `<embed>` / `<iframe>` elements are
/// kept even though embeds are otherwise stripped.
pub static VIDEO_HOSTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)//(www\.)?(dailymotion\.com|youtube\.com|youtube-nocookie\.com|player\.vimeo\.com|vimeo\.com)").unwrap()
});

/// Class / id tokens of social-sharing widgets.
pub static SHARE_ELEMENTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)share").unwrap());

/// Sentence-ending period, as matched by the sibling-aggregation
/// heuristic. The empty alternative is kept from the original algorithm.
pub static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.(| $)").unwrap());

/// A reference that already carries a URI scheme (`https:`, `mailto:`, …).
pub static HAS_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+\-.]*:").unwrap());

static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());
static ANY_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Element tags whose contents feed the candidate scorer.
pub static TAGS_TO_SCORE: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from(["section", "h2", "h3", "h4", "h5", "h6", "p", "td", "pre"])
});

/// Block-level tags. A `<div>` containing none of these is really a
/// paragraph and is retagged to `<p>` during node prep.
pub static DIV_TO_P_ELEMS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "a",
        "blockquote",
        "dl",
        "div",
        "img",
        "ol",
        "p",
        "pre",
        "table",
        "ul",
        "select",
    ])
});

/// Sibling tags that keep their own tag name when aggregated into the
/// article container; everything else is retagged to `<div>`.
pub static ALTER_TO_DIV_EXCEPTIONS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| HashSet::from(["div", "article", "section", "p"]));

/// `id` values the post-processor leaves in place.
pub static IDS_TO_PRESERVE: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| HashSet::from(["readability-content", "readability-page-1"]));

/// `class` tokens the post-processor leaves in place.
pub static CLASSES_TO_PRESERVE: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| HashSet::from([STYLED_MARKER_CLASS, "page"]));

/// HTML attributes that are purely presentational and are stripped
/// during article cleanup.
pub static PRESENTATIONAL_ATTRIBUTES: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        "align",
        "background",
        "bgcolor",
        "border",
        "cellpadding",
        "cellspacing",
        "frame",
        "hspace",
        "rules",
        "style",
        "valign",
        "vspace",
    ]
});

/// Element tags that historically accepted (now-deprecated)
/// `width`/`height` attributes; those are stripped alongside the
/// presentational set.
pub static DEPRECATED_SIZE_ATTRIBUTE_ELEMS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| HashSet::from(["table", "th", "td", "hr", "pre"]));

/// Class applied to the inline paragraph wrappers created during DIV
/// normalization. The same literal protects those wrappers from both
/// style cleanup and class stripping.
pub const STYLED_MARKER_CLASS: &str = "readability-styled";

/// Default depth limit for ancestor lookups used as quick heuristic
/// checks (e.g. "is this node inside a `<figure>`?").
pub const DEFAULT_ANCESTOR_DEPTH: i32 = 3;

/// Sentinel for "collect every ancestor up to the root".
pub const UNLIMITED_ANCESTOR_DEPTH: i32 = 0;

/// Join two optional strings with a separator, omitting the separator
/// when either side is `None`.
pub fn concat_optionals(l: Option<String>, r: Option<String>, sep: &str) -> String {
    match (l, r) {
        (Some(l), Some(r)) => format!("{}{}{}", l, sep, r),
        (Some(l), None) => l,
        (None, Some(r)) => r,
        (None, None) => String::new(),
    }
}

/// Build the string used for class/id regex matching: the node's `class`
/// and `id` attributes joined by a space.
pub fn match_string_for_node(node: &NodeRef) -> String {
    concat_optionals(node.attr_value("class"), node.attr_value("id"), " ")
}

/// Return all descendants of `node` that match `selector`, excluding
/// `node` itself. An invalid selector returns an empty `Vec` rather than
/// panicking.
pub fn select_descendants(node: &NodeRef, selector: &str) -> Vec<NodeRef> {
    match node.select(selector) {
        Ok(iter) => iter
            .filter_map(|e| {
                let n = e.as_node();
                if n == node { None } else { Some(n.clone()) }
            })
            .collect(),
        Err(_) => vec![],
    }
}

/// Detach every descendant of `node` that matches the CSS `selector`.
pub fn remove_tags_with_selector(node: &NodeRef, selector: &str) {
    for n in select_descendants(node, selector) {
        n.detach();
    }
}

/// Replace every descendant element matching `selector` with a copy that
/// has tag name `new_tag_name`, preserving attributes and children.
pub fn rename_tags_with_selector(node: &NodeRef, selector: &str, new_tag_name: &str) {
    for n in select_descendants(node, selector) {
        n.clone().rename_element(new_tag_name);
    }
}

/// Remove all HTML comment nodes (`<!-- … -->`) from the subtree rooted
/// at `node`.
pub fn remove_comment_nodes(node: &NodeRef) {
    let descendants: Vec<_> = node.descendants().collect();
    for n in descendants {
        if n.as_comment().is_some() {
            n.detach();
        }
    }
}

/// Depth-first DOM iterator step. Returns the next element node in a
/// depth-first traversal.
///
/// * `ignore_self_and_children = false` – descend into `node`'s children
///   first (normal DFS step).
/// * `ignore_self_and_children = true` – skip `node` and its subtree
///   entirely; useful when `node` is about to be detached.
///
/// Returns `None` when the end of the tree is reached. The traversal is
/// stable under in-place removals as long as the next node is computed
/// before the mutation (see [`remove_and_get_next`]).
pub fn get_next_node(node: &NodeRef, ignore_self_and_children: bool) -> Option<NodeRef> {
    if !ignore_self_and_children {
        if let Some(first_child) = node.first_element_child() {
            return Some(first_child);
        }
    }
    if let Some(next_sibling) = node.next_element_sibling() {
        return Some(next_sibling);
    }

    // Walk up the parent chain until a parent with a next sibling exists
    // (the parents themselves were already visited on the way down).
    let mut current = node.parent();
    while let Some(parent) = current {
        if let Some(sibling) = parent.next_element_sibling() {
            return Some(sibling);
        }
        current = parent.parent();
    }
    None
}

/// Detach `node` from the tree and return the next node in DFS order.
/// The next node is computed before the detach so the traversal survives
/// the mutation.
pub fn remove_and_get_next(node: &NodeRef) -> Option<NodeRef> {
    let next = get_next_node(node, true);
    node.detach();
    next
}

/// Walk the subtree rooted at `node` in DFS order and detach every
/// descendant for which `predicate(node, class_id_string)` returns
/// `true`.
pub fn remove_matched_nodes<F>(node: &NodeRef, predicate: F)
where
    F: Fn(&NodeRef, &str) -> bool,
{
    let end_of_search_marker = get_next_node(node, true);
    let mut next = get_next_node(node, false);
    while next.is_some() && next != end_of_search_marker {
        let n = next.clone().unwrap();
        let match_str = match_string_for_node(&n);
        if predicate(&n, match_str.as_str()) {
            next = remove_and_get_next(&n);
        } else {
            next = get_next_node(&n, false);
        }
    }
}

/// Walk up the parent chain from `node` and collect ancestors into a
/// `Vec` (nearest ancestor first). Stop after `max_depth` levels; pass
/// [`UNLIMITED_ANCESTOR_DEPTH`] to collect all ancestors up to the root.
pub fn get_node_ancestors(node: &NodeRef, max_depth: i32) -> Vec<NodeRef> {
    let mut ancestors = vec![];
    let mut depth = 1;
    let mut current = node.parent();
    while let Some(parent) = current {
        ancestors.push(parent.clone());
        if max_depth > 0 && depth == max_depth {
            break;
        }
        depth += 1;
        current = parent.parent();
    }
    ancestors
}

/// Return `true` if any ancestor of `node` within `max_depth` levels has
/// tag name `ancestor_tag_name`. A negative `max_depth` searches all the
/// way to the root.
pub fn has_ancestor_tag(node: &NodeRef, ancestor_tag_name: &str, max_depth: i32) -> bool {
    has_ancestor_tag_with_predicate(node, ancestor_tag_name, max_depth, |_| true)
}

/// Like [`has_ancestor_tag`], but the matching ancestor must also
/// satisfy `predicate` (e.g. a `<table>` ancestor that was classified as
/// a data table).
pub fn has_ancestor_tag_with_predicate<F>(
    node: &NodeRef,
    ancestor_tag_name: &str,
    max_depth: i32,
    predicate: F,
) -> bool
where
    F: Fn(&NodeRef) -> bool,
{
    let mut depth = 0;
    let mut current = node.clone();
    while let Some(parent) = current.parent() {
        depth += 1;
        if max_depth >= 0 && depth > max_depth {
            return false;
        }
        if parent.element_name() == Some(ancestor_tag_name) && predicate(&parent) {
            return true;
        }
        current = parent;
    }
    false
}

/// Advance through the sibling list starting at `node` until an element
/// node or a non-whitespace text node is found. Returns `None` at the
/// end of the sibling list.
pub fn next_element(node: Option<NodeRef>) -> Option<NodeRef> {
    let mut next = node;
    while let Some(ref n) = next {
        if n.as_element().is_some() || !n.text_contents().trim().is_empty() {
            break;
        }
        next = n.next_sibling();
    }
    next
}

/// Returns true if the element has no meaningful content: no text, and
/// either no child elements at all or only `<br>` / `<hr>` children.
pub fn is_element_without_content(node: &NodeRef) -> bool {
    if node.as_element().is_none() {
        return false;
    }
    if !node.text_contents().trim().is_empty() {
        return false;
    }
    let children = node.element_children();
    if children.is_empty() {
        return true;
    }
    let brs = select_descendants(node, "br").len();
    let hrs = select_descendants(node, "hr").len();
    children.len() == brs + hrs
}

/// Returns true if `node` has exactly one element child, that child is a
/// `<p>`, and the node also carries a non-whitespace text child of its
/// own.
pub fn has_single_p_inside(node: &NodeRef) -> bool {
    let children = node.element_children();
    if children.len() != 1 || children[0].element_name() != Some("p") {
        return false;
    }
    node.children()
        .any(|c| c.as_text().is_some() && !c.text_contents().trim().is_empty())
}

/// Returns true if any descendant of `node` is a block-level element
/// (one of [`DIV_TO_P_ELEMS`]).
pub fn has_child_block_element(node: &NodeRef) -> bool {
    node.children().any(|child| {
        child.as_element().is_some()
            && (DIV_TO_P_ELEMS.contains(child.element_name().unwrap_or_default())
                || has_child_block_element(&child))
    })
}

/// Move every child node of `from` (in order) to be the last children of
/// `to`. After the call, `from` has no children.
pub fn move_children(from: &NodeRef, to: &NodeRef) {
    let mut child = from.first_child();
    while let Some(current) = child {
        child = current.next_sibling();
        to.append(current);
    }
}

/// Return `true` if at least one descendant of `node` matching `sel`
/// satisfies `test_func`.
pub fn test_any_node_by_selector<F>(node: &NodeRef, sel: &str, test_func: F) -> bool
where
    F: Fn(&NodeRef) -> bool,
{
    select_descendants(node, sel).iter().any(|n| test_func(n))
}

/// The trimmed, whitespace-normalized text content of `node`: runs of
/// two or more whitespace characters collapse to a single space.
pub fn inner_text(node: &NodeRef) -> String {
    let text = node.text_contents();
    WHITESPACE_RUNS.replace_all(text.trim(), " ").to_string()
}

/// Collapse every run of whitespace (spaces, tabs, newlines) in `src` to
/// a single space and trim the ends. Idempotent.
///
/// # Examples
///
/// ```rust
/// use unclutter::shared_utils::inner_trim;
///
/// assert_eq!(inner_trim("  a\n\tb  c "), "a b c");
/// assert_eq!(inner_trim(&inner_trim(" x  y ")), "x y");
/// ```
pub fn inner_trim(src: &str) -> String {
    ANY_WHITESPACE.replace_all(src.trim(), " ").to_string()
}

/// Count the number of whitespace-delimited tokens in `text`.
///
/// # Examples
///
/// ```rust
/// use unclutter::shared_utils::word_count;
///
/// assert_eq!(word_count("Hello World      Another word"), 4);
/// assert_eq!(word_count(""), 0);
/// ```
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Compute the ratio of link-text length to total text length inside
/// `node`. Returns `0.0` when the node has no text at all.
pub fn get_link_density(node: &NodeRef) -> f64 {
    let text_length = inner_text(node).chars().count();
    if text_length == 0 {
        return 0.0;
    }
    let mut link_length = 0usize;
    for anchor in select_descendants(node, "a") {
        link_length += inner_text(&anchor).chars().count();
    }
    link_length as f64 / text_length as f64
}

fn class_or_id_weight(attr_value: &str) -> i64 {
    let mut weight = 0;
    if NEGATIVE_HINTS.is_match(attr_value) {
        weight -= 25;
    }
    if POSITIVE_HINTS.is_match(attr_value) {
        weight += 25;
    }
    weight
}

/// Score a node's `class` and `id` attributes against the positive and
/// negative word lists. Each attribute contributes +25 or −25
/// independently, so the total is in `[-50, +50]`. Returns `0` when the
/// weight-classes flag is inactive.
pub fn get_class_weight(node: &NodeRef, flags: ExtractionFlags) -> i64 {
    if !flags.contains(ExtractionFlags::WEIGHT_CLASSES) {
        return 0;
    }
    let mut weight = 0;
    if let Some(class_name) = node.attr_value("class") {
        weight += class_or_id_weight(class_name.as_str());
    }
    if let Some(tag_id) = node.attr_value("id") {
        weight += class_or_id_weight(tag_id.as_str());
    }
    weight
}

/// Resolve a possibly-relative `reference` against `base`.
///
/// Empty references, fragment-only references (`#…`), and references
/// that already carry a scheme are returned unchanged; everything else
/// resolves per RFC 3986 (so `//host/x` becomes `scheme://host/x`, a
/// leading `/` is host-relative, and `./x` / bare `x` are
/// path-relative). Unresolvable references come back unchanged.
pub fn absolutize_uri(reference: &str, base: &Url) -> String {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with('#') || HAS_SCHEME.is_match(reference) {
        return reference.to_string();
    }
    match base.join(reference) {
        Ok(resolved) => resolved.into(),
        Err(_) => reference.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionFlags;
    use crate::parser::parse_html;

    fn base() -> Url {
        Url::parse("https://example.com/a/b.html").unwrap()
    }

    #[test]
    fn absolutize_keeps_absolute_and_empty_references() {
        assert_eq!(absolutize_uri("", &base()), "");
        assert_eq!(
            absolutize_uri("https://other.org/x", &base()),
            "https://other.org/x"
        );
        assert_eq!(absolutize_uri("mailto:a@b.c", &base()), "mailto:a@b.c");
    }

    #[test]
    fn absolutize_keeps_fragments() {
        assert_eq!(absolutize_uri("#section-2", &base()), "#section-2");
    }

    #[test]
    fn absolutize_resolves_protocol_relative_with_host() {
        assert_eq!(
            absolutize_uri("//cdn.example.net/i.png", &base()),
            "https://cdn.example.net/i.png"
        );
    }

    #[test]
    fn absolutize_resolves_host_relative() {
        assert_eq!(absolutize_uri("/x", &base()), "https://example.com/x");
    }

    #[test]
    fn absolutize_resolves_path_relative() {
        assert_eq!(
            absolutize_uri("./img/cat.jpg", &base()),
            "https://example.com/a/img/cat.jpg"
        );
        assert_eq!(
            absolutize_uri("img/cat.jpg", &base()),
            "https://example.com/a/img/cat.jpg"
        );
    }

    #[test]
    fn absolutize_is_idempotent_over_all_branches() {
        for reference in ["", "#frag", "https://other.org/x", "//h.net/y", "/x", "./y", "z"] {
            let once = absolutize_uri(reference, &base());
            assert_eq!(absolutize_uri(&once, &base()), once, "input: {reference}");
        }
    }

    #[test]
    fn inner_trim_collapses_and_trims() {
        assert_eq!(inner_trim("  hello \t\n world "), "hello world");
        assert_eq!(inner_trim("plain"), "plain");
    }

    #[test]
    fn inner_text_normalizes_whitespace_runs() {
        let doc = parse_html("<p>  one\n\n   two </p>");
        let p = doc.select_first("p").unwrap().as_node().clone();
        assert_eq!(inner_text(&p), "one two");
    }

    #[test]
    fn link_density_is_zero_without_text() {
        let doc = parse_html("<div></div>");
        let div = doc.select_first("div").unwrap().as_node().clone();
        assert_eq!(get_link_density(&div), 0.0);
    }

    #[test]
    fn link_density_is_the_anchor_text_ratio() {
        let doc = parse_html("<div><a href=\"/x\">12345</a>67890</div>");
        let div = doc.select_first("div").unwrap().as_node().clone();
        assert!((get_link_density(&div) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn class_weight_sums_class_and_id() {
        let doc = parse_html(r#"<div id="sidebar" class="article">x</div>"#);
        let div = doc.select_first("div").unwrap().as_node().clone();
        assert_eq!(get_class_weight(&div, ExtractionFlags::all()), 0);
        assert_eq!(
            get_class_weight(&div, ExtractionFlags::empty()),
            0,
            "flag off forces weight 0"
        );

        let doc = parse_html(r#"<div class="article main">x</div>"#);
        let div = doc.select_first("div").unwrap().as_node().clone();
        assert_eq!(get_class_weight(&div, ExtractionFlags::all()), 25);
    }

    #[test]
    fn ancestor_lookup_respects_the_depth_limit() {
        let doc = parse_html("<div><section><span><p>leaf</p></span></section></div>");
        let p = doc.select_first("p").unwrap().as_node().clone();
        assert!(has_ancestor_tag(&p, "div", 3));
        assert!(!has_ancestor_tag(&p, "div", 2));
        assert!(has_ancestor_tag(&p, "div", -1));
    }

    #[test]
    fn get_next_node_walks_depth_first_across_subtrees() {
        let doc = parse_html("<body><div><p>a</p></div><section>b</section></body>");
        let div = doc.select_first("div").unwrap().as_node().clone();
        let p = get_next_node(&div, false).unwrap();
        assert_eq!(p.element_name(), Some("p"));
        let section = get_next_node(&p, false).unwrap();
        assert_eq!(section.element_name(), Some("section"));
        assert_eq!(get_next_node(&section, false), None);
    }

    #[test]
    fn remove_and_get_next_skips_the_removed_subtree() {
        let doc = parse_html("<body><div><p>a</p></div><section>b</section></body>");
        let div = doc.select_first("div").unwrap().as_node().clone();
        let next = remove_and_get_next(&div).unwrap();
        assert_eq!(next.element_name(), Some("section"));
        assert!(doc.select_first("p").is_err());
    }

    #[test]
    fn element_without_content_allows_br_and_hr_children() {
        let doc = parse_html("<div id=\"a\"><br><hr></div><div id=\"b\"><br>text</div>");
        let a = doc.select_first("#a").unwrap().as_node().clone();
        let b = doc.select_first("#b").unwrap().as_node().clone();
        assert!(is_element_without_content(&a));
        assert!(!is_element_without_content(&b));
    }

    #[test]
    fn single_p_inside_requires_a_text_child() {
        let doc = parse_html("<div id=\"a\"><p>x</p>stray</div><div id=\"b\"><p>x</p></div>");
        let a = doc.select_first("#a").unwrap().as_node().clone();
        let b = doc.select_first("#b").unwrap().as_node().clone();
        assert!(has_single_p_inside(&a));
        assert!(!has_single_p_inside(&b));
    }

    #[test]
    fn block_element_lookup_recurses() {
        let doc = parse_html("<div id=\"a\"><span><img src=\"x\"></span></div><div id=\"b\"><span>t</span></div>");
        let a = doc.select_first("#a").unwrap().as_node().clone();
        let b = doc.select_first("#b").unwrap().as_node().clone();
        assert!(has_child_block_element(&a));
        assert!(!has_child_block_element(&b));
    }

    #[test]
    fn word_count_splits_on_whitespace_runs() {
        assert_eq!(word_count("Hello World      Another word"), 4);
        assert_eq!(word_count("   "), 0);
    }
}
