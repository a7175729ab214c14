mod article;
mod metadata;

use crate::models::{Article, ExtractOptions};
use crate::node_utils::NodeExt;
use crate::parser::{parse_html, NodeRef};
use crate::perf::{Span, SpanLog, StderrSpanObserver};
use crate::scratch::{CONTENT_SCORE_ATTR, DATA_TABLE_ATTR};
use crate::utils::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use url::Url;

/// Validate the document URI and run the pipeline. Any internal panic is
/// absorbed and surfaces as `None`; extraction is best-effort by design.
pub fn run(html: &str, doc_uri: &str, options: ExtractOptions) -> Option<Article> {
    let base = Url::parse(doc_uri).ok()?;
    if base.cannot_be_a_base() {
        return None;
    }
    catch_unwind(AssertUnwindSafe(|| {
        Extractor::new(html, doc_uri.to_string(), base, options).extract()
    }))
    .ok()
    .flatten()
}

struct Extractor<'a> {
    html: &'a str,
    doc_uri: String,
    base: Url,
    options: ExtractOptions,
    trace: SpanLog,
}

impl Extractor<'_> {
    fn new(html: &str, doc_uri: String, base: Url, options: ExtractOptions) -> Extractor<'_> {
        Extractor {
            html,
            doc_uri,
            base,
            options,
            trace: SpanLog::new(vec![Rc::new(StderrSpanObserver)]),
        }
    }

    fn extract(self) -> Option<Article> {
        let trace = &self.trace;
        span_begin!(trace, Span::Extract);

        let document = parse_html(self.html);
        strip_scripts(&document);
        prep_document(&document, trace);

        let meta = metadata::collect_metadata(&document, &self.base, trace);
        let article_title = meta.title.clone();
        let seed_byline = if meta.byline.trim().is_empty() {
            None
        } else {
            Some(meta.byline.clone())
        };

        let grabbed = article::grab_article(
            &document,
            self.options.clone(),
            article_title.as_str(),
            seed_byline,
            trace,
        )?;
        let page = grabbed.page;

        span_begin!(trace, Span::PostProcess);
        fix_relative_uris(&page, &self.base);
        clean_ids_and_classes(&page);
        span_end!(trace, Span::PostProcess);

        let mut excerpt = meta.excerpt;
        if excerpt.trim().is_empty() {
            if let Ok(paragraph) = page.select_first("p") {
                excerpt = paragraph.as_node().text_contents().trim().to_string();
            }
        }

        let mut image_url = meta.image_url;
        if image_url.is_empty() {
            if let Ok(image) = page.select_first("img") {
                image_url = image.as_node().attr_value("src").unwrap_or_default();
            }
        }

        let content = page.to_string();
        let text_content = page.text_contents();
        let length = text_content.chars().count();

        span_end!(trace, Span::Extract);
        Some(Article {
            uri: self.doc_uri,
            title: inner_trim(&article_title),
            byline: inner_trim(&grabbed.byline),
            content,
            text_content,
            length,
            excerpt: inner_trim(&excerpt),
            favicon_url: meta.favicon_url,
            image_url,
        })
    }
}

/// Remove every `<script>` (clearing its `src` and children first) and
/// every `<noscript>` from the document.
fn strip_scripts(document: &NodeRef) {
    for script in select_descendants(document, "script") {
        script.remove_attr("src");
        while let Some(child) = script.first_child() {
            child.detach();
        }
        script.detach();
    }
    remove_tags_with_selector(document, "noscript");
}

/// Normalize ad-hoc markup before extraction: drop styles and comments,
/// retag `<font>` to `<span>`, and collapse `<br>` runs into paragraph
/// blocks.
fn prep_document(document: &NodeRef, trace: &SpanLog) {
    span_begin!(trace, Span::PrepDocument);
    remove_tags_with_selector(document, "style");
    span_mark!(trace, Span::PrepDocument, "styles_removed");
    remove_comment_nodes(document);
    replace_brs(document);
    span_mark!(trace, Span::PrepDocument, "br_runs_collapsed");
    rename_tags_with_selector(document, "font", "span");
    span_end!(trace, Span::PrepDocument);
}

/// Collapse runs of two or more `<br>` elements into `<p>` blocks.
///
/// For each `<br>`, sibling `<br>`s (whitespace between them is allowed)
/// are removed; if any were, the surviving `<br>` becomes a `<p>` that
/// adopts the following siblings until the next `<br><br>` run.
fn replace_brs(document: &NodeRef) {
    for br in select_descendants(document, "br") {
        let mut replaced = false;
        let mut next = br.next_sibling();

        while let Some(candidate) = next_element(next.clone()) {
            if candidate.element_name() != Some("br") {
                break;
            }
            replaced = true;
            next = candidate.next_sibling();
            candidate.detach();
        }

        if !replaced {
            continue;
        }

        let paragraph = crate::parser::new_html_element("p");
        br.insert_after(paragraph.clone());
        br.detach();

        let mut next = paragraph.next_sibling();
        while let Some(sibling) = next {
            // Another <br><br> means this paragraph is complete.
            if sibling.element_name() == Some("br") {
                if let Some(after) = next_element(sibling.next_sibling()) {
                    if after.element_name() == Some("br") {
                        break;
                    }
                }
            }
            next = sibling.next_sibling();
            paragraph.append(sibling);
        }
    }
}

/// Absolutize link and image targets inside the article and neutralize
/// `javascript:` anchors by replacing them with their text.
fn fix_relative_uris(root: &NodeRef, base: &Url) {
    for link in select_descendants(root, "a") {
        let href = match link.attr_value("href") {
            Some(href) => href,
            None => continue,
        };
        if href.trim().starts_with("javascript:") {
            let text = NodeRef::new_text(link.text_contents());
            link.insert_before(text);
            link.detach();
        } else {
            link.set_attr("href", &absolutize_uri(&href, base));
        }
    }
    for image in select_descendants(root, "img") {
        if let Some(src) = image.attr_value("src") {
            image.set_attr("src", &absolutize_uri(&src, base));
        }
    }
}

/// Strip ids and classes the reader output does not preserve, along with
/// the scoring scratch attributes.
fn clean_ids_and_classes(root: &NodeRef) {
    let mut node = Some(root.clone());
    while let Some(current) = node {
        if current.as_element().is_some() {
            if let Some(id) = current.attr_value("id") {
                if !IDS_TO_PRESERVE.contains(id.as_str()) {
                    current.remove_attr("id");
                }
            }
            if let Some(class) = current.attr_value("class") {
                let kept = class
                    .split_whitespace()
                    .filter(|token| CLASSES_TO_PRESERVE.contains(token))
                    .collect::<Vec<_>>()
                    .join(" ");
                if kept.is_empty() {
                    current.remove_attr("class");
                } else {
                    current.set_attr("class", &kept);
                }
            }
            current.remove_attr(CONTENT_SCORE_ATTR);
            current.remove_attr(DATA_TABLE_ATTR);
        }
        node = get_next_node(&current, false);
    }
}
