//! The [`DomHost`] trait and mutation records.

use std::sync::Arc;

use themekit_core::result::AppResult;

/// Opaque handle to a node owned by a [`DomHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `childList` mutation: nodes were added under `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The node whose children changed.
    pub target: NodeId,
    /// Nodes inserted under `target`.
    pub added_nodes: Vec<NodeId>,
}

impl MutationRecord {
    /// Whether the mutation inserted anything.
    pub fn has_added_nodes(&self) -> bool {
        !self.added_nodes.is_empty()
    }
}

/// Callback receiving batches of mutation records.
pub type MutationObserver = Arc<dyn Fn(&[MutationRecord]) + Send + Sync>;

/// Operations the runtime needs from a document.
///
/// Markup set through [`set_inner_html`](DomHost::set_inner_html) is inert:
/// embedded `<script>` elements do not run. Only script elements built with
/// [`create_element`](DomHost::create_element) and then attached execute.
pub trait DomHost: Send + Sync {
    /// First element matching `selector`, in document order.
    fn query_selector(&self, selector: &str) -> AppResult<Option<NodeId>>;

    /// All elements matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> AppResult<Vec<NodeId>>;

    /// Descendants of `root` matching `selector`, in document order.
    fn select_within(&self, root: NodeId, selector: &str) -> AppResult<Vec<NodeId>>;

    /// Whether `node` matches `selector`.
    fn matches(&self, node: NodeId, selector: &str) -> AppResult<bool>;

    /// Value of attribute `name` on `node`.
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// All attributes of `node`, in source order.
    fn attributes(&self, node: NodeId) -> AppResult<Vec<(String, String)>>;

    /// Concatenated text of `node` and its descendants.
    fn text_content(&self, node: NodeId) -> AppResult<String>;

    /// Creates a detached element.
    fn create_element(&self, tag: &str) -> AppResult<NodeId>;

    /// Sets attribute `name` on `node`.
    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> AppResult<()>;

    /// Replaces the children of `node` with a single text node.
    fn set_text(&self, node: NodeId, text: &str) -> AppResult<()>;

    /// Replaces the children of `node` with parsed (inert) markup.
    fn set_inner_html(&self, node: NodeId, html: &str) -> AppResult<()>;

    /// Children of `node`, in order.
    fn children(&self, node: NodeId) -> AppResult<Vec<NodeId>>;

    /// Appends `child` (detaching it first if needed) to `parent`.
    fn append_child(&self, parent: NodeId, child: NodeId) -> AppResult<()>;

    /// Puts `replacement` where `old` is and detaches `old`.
    fn replace_node(&self, old: NodeId, replacement: NodeId) -> AppResult<()>;

    /// Registers an observer for `childList` mutations anywhere in the document.
    fn observe(&self, observer: MutationObserver);

    /// Swaps an inert `<script>` for a freshly created copy so it executes.
    ///
    /// Attributes and source text carry over. Returns the new element.
    fn activate_script(&self, script: NodeId) -> AppResult<NodeId> {
        let fresh = self.create_element("script")?;
        for (name, value) in self.attributes(script)? {
            self.set_attribute(fresh, &name, &value)?;
        }
        let source = self.text_content(script)?;
        if !source.is_empty() {
            self.set_text(fresh, &source)?;
        }
        self.replace_node(script, fresh)?;
        Ok(fresh)
    }
}
