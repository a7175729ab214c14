use crate::parser::NodeRef;
use html5ever::{LocalName, QualName};
use kuchikikiki::{Attributes, ElementData, NodeData};
use std::cell::RefCell;

/// DOM-navigation and element-manipulation helpers implemented on
/// [`NodeRef`].
///
/// This trait is automatically in scope when you import from
/// [`crate::parser`].
pub trait NodeExt {
    /// Return the local tag name of this node if it is an element (e.g.
    /// `"div"`, `"p"`), or `None` for text / comment / document nodes.
    fn element_name(&self) -> Option<&str>;

    /// Look up an attribute by name and return its value, or `None` if
    /// the attribute is absent or this is not an element node.
    fn attr_value(&self, name: &str) -> Option<String>;

    /// Set an attribute on this node. A no-op for non-element nodes.
    fn set_attr(&self, name: &str, value: &str);

    /// Remove an attribute from this node. A no-op when absent.
    fn remove_attr(&self, name: &str);

    /// Collect the direct *element* children (skipping text and comment
    /// nodes) into a `Vec`.
    fn element_children(&self) -> Vec<NodeRef>;

    /// Return the first direct child that is an element, or `None`.
    fn first_element_child(&self) -> Option<NodeRef>;

    /// Walk forward through siblings until an element node is found, or
    /// return `None` at the end of the sibling list.
    fn next_element_sibling(&self) -> Option<NodeRef>;

    /// Walk backward through siblings until an element node is found, or
    /// return `None` at the beginning of the sibling list.
    fn previous_element_sibling(&self) -> Option<NodeRef>;

    /// Serialise the *children* of this node to an HTML string (the
    /// node's own open/close tags are **not** included).
    fn inner_html(&self) -> String;

    /// Create a new element with `tag_name`, copy all attributes and
    /// children from `self`, splice the new node into the tree in
    /// `self`'s position, and detach `self`. Returns the new node.
    ///
    /// If `self` is not an element node it is returned unchanged.
    fn rename_element(self, tag_name: &str) -> NodeRef;
}

/// Create a new, detached HTML element node with the given tag name and
/// no attributes or children.
///
/// # Examples
///
/// ```rust
/// use unclutter::{new_html_element, NodeExt};
///
/// let div = new_html_element("div");
/// assert_eq!(div.element_name(), Some("div"));
/// ```
pub fn new_html_element(tag_name: &str) -> NodeRef {
    let name = QualName::new(None, html5ever::ns!(html), LocalName::from(tag_name));
    let attributes = Attributes {
        map: Default::default(),
    };
    NodeRef::new(NodeData::Element(ElementData {
        name,
        attributes: RefCell::new(attributes),
        template_contents: None,
    }))
}

impl NodeExt for NodeRef {
    fn element_name(&self) -> Option<&str> {
        self.as_element().map(|e| e.name.local.as_ref())
    }

    fn attr_value(&self, name: &str) -> Option<String> {
        self.as_element()
            .and_then(|e| e.attributes.borrow().get(name).map(|v| v.to_string()))
    }

    fn set_attr(&self, name: &str, value: &str) {
        if let Some(e) = self.as_element() {
            e.attributes.borrow_mut().insert(name, value.to_string());
        }
    }

    fn remove_attr(&self, name: &str) {
        if let Some(e) = self.as_element() {
            e.attributes.borrow_mut().remove(name);
        }
    }

    fn element_children(&self) -> Vec<NodeRef> {
        self.children()
            .filter(|c| c.as_element().is_some())
            .collect()
    }

    fn first_element_child(&self) -> Option<NodeRef> {
        self.children().find(|c| c.as_element().is_some())
    }

    fn next_element_sibling(&self) -> Option<NodeRef> {
        let mut sibling = self.next_sibling();
        while let Some(node) = sibling {
            if node.as_element().is_some() {
                return Some(node);
            }
            sibling = node.next_sibling();
        }
        None
    }

    fn previous_element_sibling(&self) -> Option<NodeRef> {
        let mut sibling = self.previous_sibling();
        while let Some(node) = sibling {
            if node.as_element().is_some() {
                return Some(node);
            }
            sibling = node.previous_sibling();
        }
        None
    }

    fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            out.push_str(&child.to_string());
        }
        out
    }

    fn rename_element(self, tag_name: &str) -> NodeRef {
        let element = match self.as_element() {
            Some(e) => e,
            None => return self,
        };
        let name = QualName::new(None, html5ever::ns!(html), LocalName::from(tag_name));
        let renamed = NodeRef::new(NodeData::Element(ElementData {
            name,
            attributes: RefCell::new(Attributes {
                map: element.attributes.borrow().map.clone(),
            }),
            template_contents: element.template_contents.clone(),
        }));

        while let Some(child) = self.first_child() {
            renamed.append(child);
        }
        self.insert_before(renamed.clone());
        self.detach();

        renamed
    }
}
