mod cleaner;
mod prep;
mod scorer;

use crate::models::ExtractOptions;
use crate::node_utils::NodeExt;
use crate::parser::{new_html_element, parse_html, NodeRef};
use crate::perf::{Span, SpanLog};
use crate::scratch::NodeScratchExt;
use crate::utils::*;

pub const PAGE_CONTENT_ID: &str = "readability-page-1";
pub const PAGE_CONTENT_CLASS: &str = "page";

/// The result of the article-content extraction phase.
pub struct GrabbedArticle {
    /// The `<div id="readability-page-1" class="page">` element holding
    /// the article body.
    pub page: NodeRef,
    /// The byline detected during node prep, or the seed value.
    pub byline: String,
}

/// Run the scoring pipeline with the flag-degradation retry loop.
///
/// Each attempt preps the nodes, scores candidates, aggregates the
/// winner's qualifying siblings into a fresh container, and cleans the
/// result. When the surviving text is shorter than the configured
/// threshold, the document is restored from a snapshot, the next flag is
/// dropped, and the whole pass reruns. Returns `None` once every flag
/// has been dropped without producing enough text.
pub fn grab_article(
    document: &NodeRef,
    mut options: ExtractOptions,
    article_title: &str,
    seed_byline: Option<String>,
    trace: &SpanLog,
) -> Option<GrabbedArticle> {
    span_begin!(trace, Span::GrabArticle);
    let snapshot = document.to_string();
    let mut doc_node = document.clone();
    let mut byline = seed_byline;

    loop {
        let strip_unlikelys = options
            .flags
            .contains(crate::models::ExtractionFlags::STRIP_UNLIKELYS);
        let elements_to_score =
            cleaner::prep_nodes(&doc_node, &mut byline, strip_unlikelys, trace);

        let body = doc_node.select_first("body").ok()?.as_node().clone();
        let scored = scorer::select_top_candidate(&elements_to_score, &options, &body, trace);
        let top_candidate = scored.top_candidate;

        // Gather siblings that plausibly belong to the same article:
        // preambles, content split by removed ads, and so on.
        let article_content = collect_siblings(&top_candidate);

        prep::prep_article(&article_content, &options, article_title, trace);

        let text_length = inner_text(&article_content).chars().count();
        if text_length < options.char_threshold {
            span_mark!(trace, Span::GrabArticle, "attempt_below_threshold");
            doc_node = parse_html(&snapshot);
            if options.flags.degrade() {
                continue;
            }
            span_end!(trace, Span::GrabArticle);
            return None;
        }

        let page = if scored.created_top_candidate {
            // The synthetic container already holds the whole body;
            // just tag it.
            top_candidate.set_attr("id", PAGE_CONTENT_ID);
            top_candidate.set_attr("class", PAGE_CONTENT_CLASS);
            top_candidate
        } else {
            let page = new_html_element("div");
            page.set_attr("id", PAGE_CONTENT_ID);
            page.set_attr("class", PAGE_CONTENT_CLASS);
            move_children(&article_content, &page);
            article_content.append(page.clone());
            page
        };

        span_end!(trace, Span::GrabArticle);
        return Some(GrabbedArticle {
            page,
            byline: byline.unwrap_or_default(),
        });
    }
}

/// Move the top candidate and every qualifying sibling into a fresh
/// article container, retagging oddly-tagged siblings to `<div>`.
fn collect_siblings(top_candidate: &NodeRef) -> NodeRef {
    let article_content = new_html_element("div");
    let top_score = top_candidate.content_score().unwrap_or(0.0);
    let sibling_threshold = 10.0_f64.max(top_score * 0.2);

    let parent = match top_candidate.parent() {
        Some(parent) => parent,
        None => return article_content,
    };

    for sibling in parent.element_children() {
        let append = sibling == *top_candidate
            || should_append_sibling(&sibling, top_candidate, sibling_threshold);
        if !append {
            continue;
        }
        let keep_tag = sibling
            .element_name()
            .map(|name| ALTER_TO_DIV_EXCEPTIONS.contains(name))
            .unwrap_or(true);
        if keep_tag {
            article_content.append(sibling);
        } else {
            article_content.append(sibling.rename_element("div"));
        }
    }

    article_content
}

/// Whether a sibling of the top candidate carries enough signal to be
/// pulled into the article.
fn should_append_sibling(
    sibling: &NodeRef,
    top_candidate: &NodeRef,
    sibling_threshold: f64,
) -> bool {
    // Same class as the winner earns a bonus toward the threshold.
    let mut content_bonus = 0.0;
    let top_class = top_candidate.attr_value("class").unwrap_or_default();
    if !top_class.is_empty() && sibling.attr_value("class").unwrap_or_default() == top_class {
        content_bonus = top_candidate.content_score().unwrap_or(0.0) * 0.2;
    }

    if let Some(score) = sibling.content_score() {
        if score + content_bonus >= sibling_threshold {
            return true;
        }
    }

    if sibling.element_name() != Some("p") {
        return false;
    }

    let link_density = get_link_density(sibling);
    let text = inner_text(sibling);
    let text_len = text.chars().count();
    if text_len > 80 && link_density < 0.25 {
        return true;
    }
    text_len < 80 && text_len > 0 && link_density == 0.0 && SENTENCE_END.is_match(&text)
}
