use crate::node_utils::NodeExt;
use crate::parser::{new_html_element, NodeRef};
use crate::perf::{Span, SpanLog};
use crate::utils::*;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Structural tags that are dropped outright when they carry no content.
static MUST_NOT_BE_EMPTY_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from(["div", "section", "header", "h1", "h2", "h3", "h4", "h5", "h6"])
});

/// The pre-scoring pass. Walks the whole tree depth-first, records and
/// removes the byline, strips unlikely candidates and empty structural
/// nodes, normalizes misused `<div>`s into paragraphs, and collects the
/// elements whose text will feed the scorer.
pub fn prep_nodes(
    doc_node: &NodeRef,
    byline: &mut Option<String>,
    strip_unlikelys: bool,
    trace: &SpanLog,
) -> Vec<NodeRef> {
    span_begin!(trace, Span::PrepNodes);
    let mut elements_to_score: Vec<NodeRef> = vec![];
    let mut node = Some(doc_node.clone());

    while let Some(current) = node {
        let tag = current.element_name().unwrap_or_default().to_string();
        let match_string = match_string_for_node(&current);

        // Byline: record the first plausible author block, then drop it.
        if byline.is_none() {
            if let Some(found) = check_byline(&current, &match_string) {
                *byline = Some(found);
                node = remove_and_get_next(&current);
                continue;
            }
        }

        if strip_unlikelys
            && UNLIKELY_CANDIDATES.is_match(&match_string)
            && !OK_MAYBE_ITS_A_CANDIDATE.is_match(&match_string)
            && tag != "body"
            && tag != "a"
        {
            node = remove_and_get_next(&current);
            continue;
        }

        if MUST_NOT_BE_EMPTY_TAGS.contains(tag.as_str()) && is_element_without_content(&current) {
            node = remove_and_get_next(&current);
            continue;
        }

        if TAGS_TO_SCORE.contains(tag.as_str()) {
            elements_to_score.push(current.clone());
        }

        if tag == "div" {
            if let Some(replacement) = normalize_div(&current, &mut elements_to_score) {
                node = get_next_node(&replacement, false);
                continue;
            }
        }

        node = get_next_node(&current, false);
    }

    span_end!(trace, Span::PrepNodes);
    elements_to_score
}

fn check_byline(node: &NodeRef, match_string: &str) -> Option<String> {
    let rel_is_author = node.attr_value("rel").as_deref() == Some("author");
    let itemprop_is_author = node
        .attr_value("itemprop")
        .map(|v| v.contains("author"))
        .unwrap_or(false);
    if !(rel_is_author || itemprop_is_author || BYLINE_HINTS.is_match(match_string)) {
        return None;
    }

    let text = node.text_contents().trim().to_string();
    let len = text.chars().count();
    if len > 0 && len < 100 {
        Some(text)
    } else {
        None
    }
}

/// Normalize a `<div>` that is really a paragraph.
///
/// * A div wrapping a single `<p>` is replaced by that paragraph.
/// * A div with no block-level descendants is retagged to `<p>`.
/// * Otherwise, stray text children are wrapped in inline marker
///   paragraphs so their text still takes part in scoring.
///
/// Returns the node the traversal should continue from when the div
/// itself was replaced.
fn normalize_div(node: &NodeRef, elements_to_score: &mut Vec<NodeRef>) -> Option<NodeRef> {
    if has_single_p_inside(node) {
        let paragraph = node.first_element_child()?;
        node.insert_after(paragraph.clone());
        node.detach();
        elements_to_score.push(paragraph.clone());
        return Some(paragraph);
    }

    if !has_child_block_element(node) {
        let paragraph = node.clone().rename_element("p");
        elements_to_score.push(paragraph.clone());
        return Some(paragraph);
    }

    for child in node.children().collect::<Vec<_>>() {
        if child.as_text().is_some() && !child.text_contents().trim().is_empty() {
            let marker = new_html_element("p");
            marker.set_attr("style", "display:inline");
            marker.set_attr("class", STYLED_MARKER_CLASS);
            child.insert_before(marker.clone());
            marker.append(child);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_html;

    fn run(html: &str) -> (NodeRef, Vec<NodeRef>, Option<String>) {
        let doc = parse_html(html);
        let mut byline = None;
        let elements = prep_nodes(&doc, &mut byline, true, &SpanLog::new(vec![]));
        (doc, elements, byline)
    }

    #[test]
    fn collects_scoreable_tags() {
        let (_, elements, _) = run(
            "<html><body><p>one</p><section>two</section><pre>three</pre></body></html>",
        );
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn byline_block_is_recorded_and_removed() {
        let (doc, _, byline) = run(
            r#"<html><body><div class="byline">Jane Doe</div><p>Content</p></body></html>"#,
        );
        assert_eq!(byline.as_deref(), Some("Jane Doe"));
        assert!(doc.select_first(".byline").is_err());
    }

    #[test]
    fn rel_author_anchors_count_as_bylines() {
        let (_, _, byline) = run(
            r#"<html><body><a rel="author" href="/who">Bob</a><p>Content</p></body></html>"#,
        );
        assert_eq!(byline.as_deref(), Some("Bob"));
    }

    #[test]
    fn overlong_byline_text_is_rejected() {
        let long = "x".repeat(120);
        let html = format!(
            r#"<html><body><div class="byline">{}</div></body></html>"#,
            long
        );
        let (doc, _, byline) = run(&html);
        assert!(byline.is_none());
        // The block itself survives as an unlikely-candidate question,
        // not a byline; "byline" is not in the unlikely list.
        assert!(doc.select_first(".byline").is_ok());
    }

    #[test]
    fn unlikely_candidates_are_stripped() {
        let (doc, _, _) = run(
            r#"<html><body><div class="sidebar">junk</div><p>Content</p></body></html>"#,
        );
        assert!(doc.select_first(".sidebar").is_err());
    }

    #[test]
    fn unlikely_match_with_candidate_hint_survives() {
        let (doc, _, _) = run(
            r#"<html><body><div class="sidebar article">keep me</div></body></html>"#,
        );
        assert!(doc.select_first(".sidebar").is_ok());
    }

    #[test]
    fn empty_structural_nodes_are_dropped() {
        let (doc, _, _) = run("<html><body><section><br><hr></section><p>text</p></body></html>");
        assert!(doc.select_first("section").is_err());
    }

    #[test]
    fn div_wrapping_a_single_p_is_unwrapped() {
        let (doc, elements, _) = run("<html><body><div>stray<p>inner paragraph</p></div></body></html>");
        assert!(doc.select_first("div").is_err());
        assert!(elements.iter().any(|e| e.element_name() == Some("p")));
    }

    #[test]
    fn div_without_block_children_becomes_a_p() {
        let (doc, _, _) = run("<html><body><div>just some <em>inline</em> text</div></body></html>");
        assert!(doc.select_first("div").is_err());
        assert!(doc.select_first("p").is_ok());
    }

    #[test]
    fn stray_text_in_a_block_div_gets_a_styled_wrapper() {
        let (doc, _, _) = run(
            "<html><body><div>stray text<p>first paragraph</p><p>second paragraph</p></div></body></html>",
        );
        let marker = doc.select_first("p.readability-styled").unwrap();
        assert_eq!(marker.as_node().text_contents(), "stray text");
        assert_eq!(
            marker.as_node().attr_value("style").as_deref(),
            Some("display:inline")
        );
    }
}
