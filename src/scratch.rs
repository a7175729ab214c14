use crate::node_utils::NodeExt;
use crate::parser::NodeRef;

/// Attribute under which a candidate's readability score is stored.
pub(crate) const CONTENT_SCORE_ATTR: &str = "_readabilityContentScore";

/// Attribute under which a table's data/layout classification is stored.
pub(crate) const DATA_TABLE_ATTR: &str = "_readabilityDataTable";

/// Extension trait that attaches scoring and table-classification scratch
/// state to a [`NodeRef`].
///
/// The state lives in namespaced attributes on the element itself, so it
/// travels with the node when the node is moved, retagged, or appended to
/// another parent mid-extraction. Both attributes are stripped from the
/// output during post-processing; they are observable only mid-parse.
pub trait NodeScratchExt {
    /// Return the score previously assigned to this node, or `None` if
    /// it has not been initialized as a candidate yet.
    fn content_score(&self) -> Option<f64>;

    /// Overwrite this node's score.
    fn set_content_score(&self, value: f64);

    /// Add `delta` to this node's score (an absent score counts as `0.0`).
    fn bump_content_score(&self, delta: f64);

    /// Return whether this table was classified as a *data* table (as
    /// opposed to a layout table). Defaults to `false` when unset.
    fn is_data_table(&self) -> bool;

    /// Classify this table. Data tables are protected from removal in
    /// the conditional-cleaning pass.
    fn set_data_table(&self, value: bool);
}

impl NodeScratchExt for NodeRef {
    fn content_score(&self) -> Option<f64> {
        self.attr_value(CONTENT_SCORE_ATTR)
            .and_then(|v| v.parse::<f64>().ok())
    }

    fn set_content_score(&self, value: f64) {
        self.set_attr(CONTENT_SCORE_ATTR, &value.to_string());
    }

    fn bump_content_score(&self, delta: f64) {
        self.set_content_score(self.content_score().unwrap_or(0.0) + delta);
    }

    fn is_data_table(&self) -> bool {
        self.attr_value(DATA_TABLE_ATTR).as_deref() == Some("true")
    }

    fn set_data_table(&self, value: bool) {
        self.set_attr(DATA_TABLE_ATTR, if value { "true" } else { "false" });
    }
}
