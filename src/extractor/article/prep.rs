use crate::models::{ExtractOptions, ExtractionFlags};
use crate::node_utils::NodeExt;
use crate::parser::NodeRef;
use crate::perf::{Span, SpanLog};
use crate::scratch::NodeScratchExt;
use crate::utils::*;

/// Post-extraction cleanup of the aggregated article container.
///
/// Runs the fixed cleaning sequence: presentational-attribute removal,
/// data-table marking, embed/form/widget cleaning, conditional pruning
/// of low-density containers, and paragraph trimming.
pub fn prep_article(
    article_content: &NodeRef,
    options: &ExtractOptions,
    article_title: &str,
    trace: &SpanLog,
) {
    span_begin!(trace, Span::PrepArticle);

    clean_styles(article_content);

    // Classify tables before anything is removed, so data tables are
    // protected from the conditional cleaning below.
    mark_data_tables(article_content);

    clean_conditionally(article_content, "form", options);
    clean_conditionally(article_content, "fieldset", options);
    clean(article_content, "object");
    clean(article_content, "embed");
    clean(article_content, "h1");
    clean(article_content, "footer");

    // Sharing widgets below the top candidate; the top-level children
    // themselves are never removed here.
    for child in article_content.children().collect::<Vec<_>>() {
        remove_matched_nodes(&child, |_, match_str| SHARE_ELEMENTS.is_match(match_str));
    }

    remove_heading_duplicating_title(article_content, article_title);

    clean(article_content, "iframe");
    clean(article_content, "input");
    clean(article_content, "textarea");
    clean(article_content, "select");
    clean(article_content, "button");
    clean_headers(article_content, options);

    // Last, as the earlier passes may have changed the densities these
    // decisions rest on.
    clean_conditionally(article_content, "table", options);
    clean_conditionally(article_content, "ul", options);
    clean_conditionally(article_content, "div", options);

    remove_empty_paragraphs(article_content);
    remove_breaks_before_paragraphs(article_content);

    span_end!(trace, Span::PrepArticle);
}

/// Recursively strip presentational attributes, leaving `<svg>` subtrees
/// and the inline paragraph markers untouched.
fn clean_styles(node: &NodeRef) {
    if node.as_element().is_none() || node.element_name() == Some("svg") {
        return;
    }

    if node.attr_value("class").as_deref() != Some(STYLED_MARKER_CLASS) {
        for attr in PRESENTATIONAL_ATTRIBUTES.iter() {
            node.remove_attr(attr);
        }
        if DEPRECATED_SIZE_ATTRIBUTE_ELEMS.contains(node.element_name().unwrap_or_default()) {
            node.remove_attr("width");
            node.remove_attr("height");
        }
    }

    let mut child = node.first_element_child();
    while let Some(current) = child {
        clean_styles(&current);
        child = current.next_element_sibling();
    }
}

/// Classify every `<table>` as data (kept) or layout (cleaned like any
/// other block), using the same precedence of signals as accessibility
/// table heuristics.
fn mark_data_tables(root: &NodeRef) {
    for table in select_descendants(root, "table") {
        if table.attr_value("role").as_deref() == Some("presentation") {
            table.set_data_table(false);
            continue;
        }
        if table.attr_value("datatable").as_deref() == Some("0") {
            table.set_data_table(false);
            continue;
        }
        if !table
            .attr_value("summary")
            .unwrap_or_default()
            .trim()
            .is_empty()
        {
            table.set_data_table(true);
            continue;
        }
        if let Ok(caption) = table.select_first("caption") {
            if caption.as_node().first_child().is_some() {
                table.set_data_table(true);
                continue;
            }
        }
        if ["col", "colgroup", "tfoot", "thead", "th"]
            .iter()
            .any(|tag| !select_descendants(&table, tag).is_empty())
        {
            table.set_data_table(true);
            continue;
        }
        if !select_descendants(&table, "table").is_empty() {
            table.set_data_table(false);
            continue;
        }
        let (rows, columns) = table_dimensions(&table);
        if rows >= 10 || columns > 4 {
            table.set_data_table(true);
            continue;
        }
        table.set_data_table(rows * columns > 10);
    }
}

/// Row count sums `rowspan` over `<tr>`; column count is the widest
/// row's `colspan` sum over `<td>`.
fn table_dimensions(table: &NodeRef) -> (u64, u64) {
    let mut rows = 0u64;
    let mut columns = 0u64;
    for tr in select_descendants(table, "tr") {
        rows += tr
            .attr_value("rowspan")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1);
        let mut row_columns = 0u64;
        for td in select_descendants(&tr, "td") {
            row_columns += td
                .attr_value("colspan")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(1);
        }
        columns = columns.max(row_columns);
    }
    (rows, columns)
}

/// Remove every descendant with the given tag. Embed tags survive when
/// they look like a video from an allowed host.
fn clean(root: &NodeRef, tag: &str) {
    let is_embed = matches!(tag, "object" | "embed" | "iframe");
    for node in select_descendants(root, tag).into_iter().rev() {
        if is_embed && is_video_embed(&node) {
            continue;
        }
        node.detach();
    }
}

/// An embed is worth keeping when any of its attribute values or its
/// inner HTML point at an allowed video host.
pub(crate) fn is_video_embed(node: &NodeRef) -> bool {
    let element = match node.as_element() {
        Some(e) => e,
        None => return false,
    };
    for (_, attr) in element.attributes.borrow().map.iter() {
        if VIDEO_HOSTS.is_match(&attr.value) {
            return true;
        }
    }
    VIDEO_HOSTS.is_match(&node.inner_html())
}

/// Prune descendants of `tag` that look like boilerplate: negative class
/// weight, link farms, image grids without captions, input clusters, or
/// bare embeds. Data tables and their contents are exempt.
fn clean_conditionally(root: &NodeRef, tag: &str, options: &ExtractOptions) {
    if !options.flags.contains(ExtractionFlags::CLEAN_CONDITIONALLY) {
        return;
    }
    let is_list = tag == "ul" || tag == "ol";
    for node in select_descendants(root, tag).into_iter().rev() {
        if should_remove_conditionally(&node, is_list, options) {
            node.detach();
        }
    }
}

fn should_remove_conditionally(node: &NodeRef, is_list: bool, options: &ExtractOptions) -> bool {
    if node.element_name() == Some("table") && node.is_data_table() {
        return false;
    }
    if has_ancestor_tag_with_predicate(node, "table", -1, |t| t.is_data_table()) {
        return false;
    }

    let weight = get_class_weight(node, options.flags);
    if weight < 0 {
        return true;
    }

    let text = inner_text(node);
    if text.matches(',').count() >= 10 {
        return false;
    }

    // Few commas: weigh the non-paragraph signals.
    let p = select_descendants(node, "p").len();
    let img = select_descendants(node, "img").len();
    let li = select_descendants(node, "li").len() as i64 - 100;
    let input = select_descendants(node, "input").len();
    let mut embed_count = 0usize;
    for embed_tag in ["object", "embed", "iframe"] {
        for embed in select_descendants(node, embed_tag) {
            if !is_video_embed(&embed) {
                embed_count += 1;
            }
        }
    }
    let link_density = get_link_density(node);
    let content_len = text.chars().count();
    let in_figure = has_ancestor_tag(node, "figure", DEFAULT_ANCESTOR_DEPTH);

    (img > 1 && (p as f64) / (img as f64) < 0.5 && !in_figure)
        || (!is_list && li > p as i64)
        || (input > p / 3)
        || (!is_list && content_len < 25 && (img == 0 || img > 2) && !in_figure)
        || (!is_list && weight < 25 && link_density > 0.2)
        || (weight >= 25 && link_density > 0.5)
        || ((embed_count == 1 && content_len < 75) || embed_count > 1)
}

/// Drop a lone `<h2>` that merely repeats the page title.
fn remove_heading_duplicating_title(root: &NodeRef, article_title: &str) {
    let headings = select_descendants(root, "h2");
    if headings.len() != 1 {
        return;
    }
    let title_len = article_title.chars().count() as f64;
    if title_len == 0.0 {
        return;
    }
    let heading_text = inner_text(&headings[0]);
    let length_delta = (heading_text.chars().count() as f64 - title_len).abs() / title_len;
    if length_delta < 0.5
        && (heading_text.contains(article_title) || article_title.contains(&heading_text))
    {
        headings[0].detach();
    }
}

/// Remove `<h1>` / `<h2>` headers with a negative class weight.
fn clean_headers(root: &NodeRef, options: &ExtractOptions) {
    for tag in ["h1", "h2"] {
        for heading in select_descendants(root, tag).into_iter().rev() {
            if get_class_weight(&heading, options.flags) < 0 {
                heading.detach();
            }
        }
    }
}

/// Remove paragraphs that hold neither text nor any media element.
fn remove_empty_paragraphs(root: &NodeRef) {
    for paragraph in select_descendants(root, "p").into_iter().rev() {
        let media = select_descendants(&paragraph, "img").len()
            + select_descendants(&paragraph, "embed").len()
            + select_descendants(&paragraph, "object").len()
            + select_descendants(&paragraph, "iframe").len();
        if media == 0 && paragraph.text_contents().trim().is_empty() {
            paragraph.detach();
        }
    }
}

/// A `<br>` directly ahead of a paragraph is redundant.
fn remove_breaks_before_paragraphs(root: &NodeRef) {
    for br in select_descendants(root, "br") {
        if let Some(next) = next_element(br.next_sibling()) {
            if next.element_name() == Some("p") {
                br.detach();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_html;

    fn options() -> ExtractOptions {
        ExtractOptions::default()
    }

    fn prep(html: &str) -> NodeRef {
        let doc = parse_html(html);
        let body = doc.select_first("body").unwrap().as_node().clone();
        prep_article(&body, &options(), "The Article Title", &SpanLog::new(vec![]));
        body
    }

    #[test]
    fn presentational_attributes_are_stripped() {
        let body = prep(
            r#"<html><body><div align="center" bgcolor="red"><table width="100" height="50" border="1"><tr><td>Cell contents with plenty of words, enough of them to stay.</td></tr></table></div></body></html>"#,
        );
        let div = body.select_first("div").unwrap().as_node().clone();
        assert!(div.attr_value("align").is_none());
        assert!(div.attr_value("bgcolor").is_none());
        let table = body.select_first("table").unwrap().as_node().clone();
        assert!(table.attr_value("width").is_none());
        assert!(table.attr_value("height").is_none());
        assert!(table.attr_value("border").is_none());
    }

    #[test]
    fn styled_markers_keep_their_inline_style() {
        let body = prep(
            r#"<html><body><p class="readability-styled" style="display:inline">kept</p></body></html>"#,
        );
        let marker = body.select_first("p").unwrap().as_node().clone();
        assert_eq!(marker.attr_value("style").as_deref(), Some("display:inline"));
    }

    #[test]
    fn presentation_role_beats_a_large_row_count() {
        let rows = "<tr><td>a</td><td>b</td></tr>".repeat(12);
        let html = format!(
            r#"<html><body><table role="presentation">{}</table></body></html>"#,
            rows
        );
        let doc = parse_html(&html);
        let body = doc.select_first("body").unwrap().as_node().clone();
        mark_data_tables(&body);
        let table = body.select_first("table").unwrap().as_node().clone();
        assert!(!table.is_data_table());
    }

    #[test]
    fn summary_beats_a_nested_table() {
        let html = r#"<html><body><table summary="totals"><tr><td><table><tr><td>x</td></tr></table></td></tr></table></body></html>"#;
        let doc = parse_html(html);
        let body = doc.select_first("body").unwrap().as_node().clone();
        mark_data_tables(&body);
        let outer = body.select_first("table").unwrap().as_node().clone();
        assert!(outer.is_data_table());
    }

    #[test]
    fn th_descendants_mark_a_data_table() {
        let html = "<html><body><table><tr><th>Name</th></tr><tr><td>Jill</td></tr></table></body></html>";
        let doc = parse_html(html);
        let body = doc.select_first("body").unwrap().as_node().clone();
        mark_data_tables(&body);
        let table = body.select_first("table").unwrap().as_node().clone();
        assert!(table.is_data_table());
    }

    #[test]
    fn small_plain_tables_classify_by_cell_count() {
        let html = "<html><body><table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table></body></html>";
        let doc = parse_html(html);
        let body = doc.select_first("body").unwrap().as_node().clone();
        mark_data_tables(&body);
        let table = body.select_first("table").unwrap().as_node().clone();
        // 2 rows * 2 columns = 4, not > 10.
        assert!(!table.is_data_table());
    }

    #[test]
    fn video_iframes_survive_cleaning() {
        let body = prep(
            r#"<html><body><p>A paragraph with enough words to count as real content here.</p><iframe src="https://www.youtube.com/embed/xyz"></iframe><iframe src="https://ads.example.com/spot"></iframe></body></html>"#,
        );
        let frames = select_descendants(&body, "iframe");
        assert_eq!(frames.len(), 1);
        assert!(frames[0]
            .attr_value("src")
            .unwrap()
            .contains("youtube.com"));
    }

    #[test]
    fn negative_class_weight_removes_a_container() {
        let body = prep(
            r#"<html><body><div class="sponsor">see our partners</div><p>real text</p></body></html>"#,
        );
        assert!(body.select_first(".sponsor").is_err());
    }

    #[test]
    fn link_farms_are_pruned() {
        let links = r#"<a href="/1">one link</a> <a href="/2">two link</a> <a href="/3">three link</a>"#;
        let html = format!(
            r#"<html><body><div id="farm">{}</div><p>body text</p></body></html>"#,
            links
        );
        let body = prep(&html);
        assert!(body.select_first("#farm").is_err());
    }

    #[test]
    fn data_tables_are_protected_from_conditional_cleaning() {
        let html = r#"<html><body><table summary="stats"><tr><td><a href="/a">a</a></td><td><a href="/b">b</a></td></tr></table></body></html>"#;
        let body = prep(html);
        assert!(body.select_first("table").is_ok());
    }

    #[test]
    fn lone_heading_repeating_the_title_is_removed() {
        let body = prep(
            "<html><body><h2>The Article Title</h2><p>content paragraph</p></body></html>",
        );
        assert!(body.select_first("h2").is_err());
    }

    #[test]
    fn unrelated_heading_is_kept() {
        let body = prep(
            "<html><body><h2>Completely Different Subject Altogether</h2><p>content paragraph</p></body></html>",
        );
        assert!(body.select_first("h2").is_ok());
    }

    #[test]
    fn empty_paragraphs_are_removed_but_media_paragraphs_stay() {
        let body = prep(
            r#"<html><body><p>   </p><p><img src="https://example.com/i.png"></p><p>text</p></body></html>"#,
        );
        assert_eq!(select_descendants(&body, "p").len(), 2);
    }

    #[test]
    fn br_before_paragraph_is_removed() {
        let body = prep(
            "<html><body><div>a line of text that is long enough to stay around<br>  <p>the paragraph that follows the break</p></div></body></html>",
        );
        assert!(body.select_first("br").is_err());
        assert!(body.select_first("p").is_ok());
    }

    #[test]
    fn share_widgets_below_top_level_children_are_removed() {
        let body = prep(
            r#"<html><body><div><div class="share-buttons">share me</div><p>kept text that is definitely long enough to stay around</p></div></body></html>"#,
        );
        assert!(body.select_first(".share-buttons").is_err());
        assert!(body.select_first("p").is_ok());
    }

    #[test]
    fn forms_and_inputs_are_cleaned() {
        let body = prep(
            r#"<html><body><form><input type="text"><button>go</button></form><p>text</p></body></html>"#,
        );
        assert!(body.select_first("form").is_err());
        assert!(body.select_first("input").is_err());
        assert!(body.select_first("button").is_err());
    }
}
