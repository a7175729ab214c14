use bitflags::bitflags;

bitflags! {
    /// The heuristic toggles used by the extraction algorithm.
    ///
    /// All three are on by default. When a pass yields too little text,
    /// the orchestrator clears them one at a time in a fixed order
    /// (strip-unlikelys, then weight-classes, then clean-conditionally)
    /// and retries; a cleared flag is never re-set within one extraction.
    pub struct ExtractionFlags: u32 {
        /// Remove elements whose class/id string suggests navigation,
        /// ads, comments, or other non-content.
        const STRIP_UNLIKELYS = 1 << 0;
        /// Adjust candidate scores using positive/negative class and id
        /// word lists.
        const WEIGHT_CLASSES = 1 << 1;
        /// Prune low-density containers (link farms, forms, layout
        /// tables) from the extracted article.
        const CLEAN_CONDITIONALLY = 1 << 2;
    }
}

impl ExtractionFlags {
    /// Clear the first still-active flag in degradation order. Returns
    /// `false` when no flag was left to clear, i.e. extraction has run
    /// out of retry strategies.
    pub(crate) fn degrade(&mut self) -> bool {
        for flag in [
            ExtractionFlags::STRIP_UNLIKELYS,
            ExtractionFlags::WEIGHT_CLASSES,
            ExtractionFlags::CLEAN_CONDITIONALLY,
        ] {
            if self.contains(flag) {
                self.remove(flag);
                return true;
            }
        }
        false
    }
}

/// The output of [`crate::extract`]: the article body and the page
/// metadata that was recovered alongside it.
///
/// `byline`, `excerpt`, `favicon_url` and `image_url` may individually be
/// empty strings in a successful result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// The URI the page was fetched from, as passed to [`crate::extract`].
    pub uri: String,
    /// The page title, cleaned of site-name suffixes where possible.
    pub title: String,
    /// The article author, if one could be detected.
    pub byline: String,
    /// The article body as serialized HTML. Always a single
    /// `<div id="readability-page-1" class="page">` element.
    pub content: String,
    /// The plain text of `content`.
    pub text_content: String,
    /// The character count of `text_content`.
    pub length: usize,
    /// A short description, from page metadata or the first paragraph.
    pub excerpt: String,
    /// The page favicon URL, absolutized against `uri`.
    pub favicon_url: String,
    /// A representative image URL, from page metadata or the first
    /// `<img>` of the article body.
    pub image_url: String,
}

/// Knobs that control the extraction algorithm.
///
/// The defaults match the canonical thresholds of the algorithm; start
/// from [`Default`] and only override what you need.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// The initial heuristic flag set. Flags are degraded internally
    /// across retries; see [`ExtractionFlags`].
    pub flags: ExtractionFlags,
    /// How many top-scoring candidate nodes to retain before picking the
    /// winner and probing for a better common ancestor.
    pub n_top_candidates: usize,
    /// Minimum character count the extracted body must reach before it
    /// is accepted. Falling short triggers a retry with degraded flags.
    pub char_threshold: usize,
}

impl Default for ExtractOptions {
    fn default() -> ExtractOptions {
        ExtractOptions {
            flags: ExtractionFlags::all(),
            n_top_candidates: 5,
            char_threshold: 500,
        }
    }
}
