//! Extracts the primary readable article from a web page's HTML.
//!
//! Given the raw HTML of a page and the URI it was fetched from, the
//! extractor scores the DOM for content density, prunes navigation,
//! ads and other boilerplate, and returns the article body together
//! with the page metadata (title, byline, excerpt, favicon and
//! representative image).
//!
//! ## Quick start
//!
//! ```rust
//! use unclutter::{extract, ExtractOptions};
//!
//! let html = "<html><body><article><p>The actual article text goes here.</p></article></body></html>";
//! let article = extract(html, "https://example.com/article", ExtractOptions::default());
//!
//! // `article` is None here: the paragraph is below the default
//! // character threshold. A real page yields Some(Article).
//! ```
//!
//! ## Module layout
//!
//! * **Top level** – [`extract`] is the single entry-point. [`Article`] and
//!   [`ExtractOptions`] are the main public types.
//! * [`parser`] – thin wrappers around the underlying HTML parser
//!   ([`parser::NodeRef`], [`parser::parse_html`]).
//! * [`shared_utils`] – a curated subset of the internal DOM and text
//!   helpers, useful when post-processing extracted content.

#[macro_use]
mod perf;

mod extractor;
mod models;
mod node_utils;
mod scratch;
mod utils;

pub use models::{Article, ExtractOptions, ExtractionFlags};
pub use node_utils::{new_html_element, NodeExt};
pub use scratch::NodeScratchExt;

/// Convenience re-exports of helpers for post-processing extracted content.
///
/// These are a stable, curated subset of the internal utility library.
pub mod shared_utils {
    pub use crate::utils::{absolutize_uri, inner_text, inner_trim, move_children, word_count};
}

/// Thin wrappers around the underlying HTML parser.
///
/// [`NodeRef`] is the reference-counted DOM node type used throughout the
/// crate. [`parse_html`] parses a complete HTML document into a [`NodeRef`]
/// tree.
pub mod parser {
    use kuchikikiki::traits::TendrilSink;
    pub use kuchikikiki::{Attributes, NodeRef};
    pub use crate::node_utils::{new_html_element, NodeExt};

    /// Parse an HTML string into a [`NodeRef`] document tree.
    ///
    /// The parser follows the HTML5 specification; an implicit `<html>`,
    /// `<head>`, and `<body>` are synthesised when missing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unclutter::parser::parse_html;
    ///
    /// let doc = parse_html("<div><p>hello</p></div>");
    /// assert!(doc.select_first("p").is_ok());
    /// ```
    pub fn parse_html(html: &str) -> NodeRef {
        kuchikikiki::parse_html().one(html)
    }
}

/// Extract the main article content from an HTML page.
///
/// This is the primary entry-point of the crate. It runs the full
/// extraction pipeline: document preparation, metadata collection,
/// candidate scoring with flag-degradation retries, sibling aggregation,
/// and post-extraction cleanup.
///
/// # Arguments
///
/// * `html_str` – the raw HTML source of the page.
/// * `doc_uri` – the URL the page was fetched from. Must be an absolute
///   URL with scheme and authority; it is used to resolve relative URLs
///   in `<a href>` and `<img src>`.
/// * `options` – tuning knobs for the extraction algorithm.
///   [`ExtractOptions::default()`] matches the canonical thresholds.
///
/// # Returns
///
/// `Some(Article)` when an article body with enough text was recovered,
/// `None` otherwise. A malformed `doc_uri`, a page without readable
/// content, and any internal failure all surface as `None`; a partial
/// article is never returned.
pub fn extract(html_str: &str, doc_uri: &str, options: ExtractOptions) -> Option<Article> {
    extractor::run(html_str, doc_uri, options)
}
