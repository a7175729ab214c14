use crate::models::{ExtractOptions, ExtractionFlags};
use crate::node_utils::NodeExt;
use crate::parser::{new_html_element, NodeRef};
use crate::perf::{Span, SpanLog};
use crate::scratch::NodeScratchExt;
use crate::utils::*;
use std::cmp::Ordering;

/// How many runner-up candidates must share an ancestor before that
/// ancestor is adopted as the top candidate.
const MINIMUM_TOP_CANDIDATES: usize = 3;

/// Scored elements feed points to at most this many ancestors.
const SCORE_ANCESTOR_DEPTH: i32 = 3;

/// Paragraphs shorter than this contribute nothing.
const MIN_PARAGRAPH_LENGTH: usize = 25;

/// The output of the scoring phase.
pub struct ScoringResult {
    /// The DOM node that ranked highest as an article-content container.
    pub top_candidate: NodeRef,
    /// `true` when no real candidate was found and a synthetic `<div>`
    /// holding the body's children was created as a last resort.
    pub created_top_candidate: bool,
}

/// Give `node` its base score from its tag name plus the class/id
/// weight, marking it as a candidate.
fn initialize_node(node: &NodeRef, flags: ExtractionFlags) {
    node.set_content_score(0.0);
    if let Some(name) = node.element_name() {
        let base = match name {
            "div" => 5.0,
            "pre" | "td" | "blockquote" => 3.0,
            "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
            _ => 0.0,
        };
        node.bump_content_score(base);
    }
    node.bump_content_score(get_class_weight(node, flags) as f64);
}

/// Score the collected elements and pick the best content container.
///
/// Each element contributes points to its nearest ancestors based on
/// comma count and text length. The top scorers are then re-ranked with
/// a link-density penalty, and the winner is optionally promoted up the
/// ancestor chain when the surrounding structure suggests a better
/// container.
pub fn select_top_candidate(
    elements_to_score: &[NodeRef],
    options: &ExtractOptions,
    body: &NodeRef,
    trace: &SpanLog,
) -> ScoringResult {
    span_begin!(trace, Span::ScoreCandidates);
    let flags = options.flags;
    let mut candidates: Vec<NodeRef> = vec![];

    for element in elements_to_score {
        if element.parent().is_none() || element.element_name().is_none() {
            continue;
        }
        let text = inner_text(element);
        let text_len = text.chars().count();
        if text_len < MIN_PARAGRAPH_LENGTH {
            continue;
        }
        let ancestors = get_node_ancestors(element, SCORE_ANCESTOR_DEPTH);
        if ancestors.is_empty() {
            continue;
        }

        // One point for the paragraph itself, one per comma-separated
        // segment, and one per 100 characters up to three.
        let mut content_score = 1.0;
        content_score += text.split(',').count() as f64;
        content_score += (text_len / 100).min(3) as f64;

        for (level, ancestor) in ancestors.iter().enumerate() {
            if ancestor.element_name().is_none() {
                continue;
            }
            if ancestor.content_score().is_none() {
                initialize_node(ancestor, flags);
                candidates.push(ancestor.clone());
            }
            // parent: full score, grandparent: half, further: level * 3.
            let divider = match level {
                0 => 1.0,
                1 => 2.0,
                _ => level as f64 * 3.0,
            };
            ancestor.bump_content_score(content_score / divider);
        }
    }

    span_mark!(trace, Span::ScoreCandidates, "ancestors_scored");
    let top_candidates = rank_candidates(&mut candidates, options.n_top_candidates);
    span_mark!(trace, Span::ScoreCandidates, "candidates_ranked");

    let mut created_top_candidate = false;
    let mut top = new_html_element("div");

    let best = top_candidates.first();
    if best.is_none() || best.unwrap().element_name() == Some("body") {
        // Last resort: wrap everything in the body (text nodes included)
        // in a synthetic container and use that.
        created_top_candidate = true;
        move_children(body, &top);
        body.append(top.clone());
        initialize_node(&top, flags);
    } else {
        top = best.unwrap().clone();
        promote_shared_ancestor(&mut top, &top_candidates);
        if top.content_score().is_none() {
            initialize_node(&top, flags);
        }
        ascend_to_better_parent(&mut top);
        collapse_only_child_chains(&mut top);
        if top.content_score().is_none() {
            initialize_node(&top, flags);
        }
    }

    span_end!(trace, Span::ScoreCandidates);
    ScoringResult {
        top_candidate: top,
        created_top_candidate,
    }
}

/// Penalize each candidate's score by its link density, then keep the
/// `n_top` best in descending order.
fn rank_candidates(candidates: &mut Vec<NodeRef>, n_top: usize) -> Vec<NodeRef> {
    for candidate in candidates.iter() {
        if let Some(score) = candidate.content_score() {
            candidate.set_content_score(score * (1.0 - get_link_density(candidate)));
        }
    }
    candidates.sort_by(|lhs, rhs| {
        rhs.content_score()
            .unwrap_or(0.0)
            .partial_cmp(&lhs.content_score().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal)
    });
    candidates.truncate(n_top);
    candidates.clone()
}

/// When at least three runner-ups score within 75% of the winner and
/// share a common ancestor, that ancestor likely holds the whole
/// article; adopt it.
fn promote_shared_ancestor(top: &mut NodeRef, top_candidates: &[NodeRef]) {
    let top_score = top.content_score().unwrap_or(0.0);
    let mut alternative_ancestors: Vec<Vec<NodeRef>> = vec![];
    for candidate in top_candidates.iter().skip(1) {
        if candidate.content_score().unwrap_or(0.0) >= top_score * 0.75 {
            alternative_ancestors.push(get_node_ancestors(candidate, UNLIMITED_ANCESTOR_DEPTH));
        }
    }
    if alternative_ancestors.len() < MINIMUM_TOP_CANDIDATES {
        return;
    }

    let mut parent = top.parent();
    while let Some(p) = parent {
        if p.element_name() == Some("body") || p.element_name().is_none() {
            break;
        }
        let lists_containing = alternative_ancestors
            .iter()
            .filter(|ancestors| ancestors.contains(&p))
            .count();
        if lists_containing >= MINIMUM_TOP_CANDIDATES {
            *top = p;
            return;
        }
        parent = p.parent();
    }
}

/// Parents of candidates hold residual scores. A rising score on the way
/// up means more of the article lives around the current winner, so the
/// parent is the better container; falling below a third of the winning
/// score ends the climb.
fn ascend_to_better_parent(top: &mut NodeRef) {
    let mut last_score = top.content_score().unwrap_or(0.0);
    let score_threshold = last_score / 3.0;
    let mut parent = top.parent();

    while let Some(p) = parent {
        if p.element_name() == Some("body") || p.element_name().is_none() {
            break;
        }
        let parent_score = match p.content_score() {
            Some(score) => score,
            None => {
                parent = p.parent();
                continue;
            }
        };
        if parent_score < score_threshold {
            break;
        }
        if parent_score > last_score {
            *top = p;
            break;
        }
        last_score = parent_score;
        parent = p.parent();
    }
}

/// An only child tells us nothing about boundaries; hoist the winner to
/// the outermost single-child wrapper so sibling joining can see real
/// siblings.
fn collapse_only_child_chains(top: &mut NodeRef) {
    let mut parent = top.parent();
    while let Some(p) = parent {
        if p.element_name() == Some("body")
            || p.element_name().is_none()
            || p.element_children().len() != 1
        {
            break;
        }
        *top = p.clone();
        parent = p.parent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_html;

    fn long_paragraph(marker: &str) -> String {
        format!("<p>{} {}</p>", marker, "words and words, more words. ".repeat(8))
    }

    #[test]
    fn parent_of_scored_paragraphs_wins() {
        let html = format!(
            "<html><body><div id=\"winner\">{}{}</div><div id=\"noise\"><p>tiny</p></div></body></html>",
            long_paragraph("first"),
            long_paragraph("second"),
        );
        let doc = parse_html(&html);
        let mut byline = None;
        let elements = super::super::cleaner::prep_nodes(
            &doc,
            &mut byline,
            true,
            &SpanLog::new(vec![]),
        );
        let body = doc.select_first("body").unwrap().as_node().clone();
        let result = select_top_candidate(
            &elements,
            &ExtractOptions::default(),
            &body,
            &SpanLog::new(vec![]),
        );
        assert!(!result.created_top_candidate);
        assert_eq!(
            result.top_candidate.attr_value("id").as_deref(),
            Some("winner")
        );
        assert!(result.top_candidate.content_score().unwrap() > 0.0);
    }

    #[test]
    fn empty_candidate_list_falls_back_to_a_synthetic_container() {
        let doc = parse_html("<html><body><p>too short</p></body></html>");
        let body = doc.select_first("body").unwrap().as_node().clone();
        let result = select_top_candidate(
            &[],
            &ExtractOptions::default(),
            &body,
            &SpanLog::new(vec![]),
        );
        assert!(result.created_top_candidate);
        assert_eq!(result.top_candidate.element_name(), Some("div"));
        assert_eq!(result.top_candidate.text_contents(), "too short");
        assert!(result.top_candidate.content_score().is_some());
    }

    #[test]
    fn orphaned_elements_are_ignored_without_panic() {
        let doc = parse_html("<p>This paragraph is long enough to be scored on its own merits.</p>");
        let orphan = doc.select_first("p").unwrap().as_node().clone();
        orphan.detach();
        let body = new_html_element("body");
        let _ = select_top_candidate(
            &[orphan],
            &ExtractOptions::default(),
            &body,
            &SpanLog::new(vec![]),
        );
    }
}
