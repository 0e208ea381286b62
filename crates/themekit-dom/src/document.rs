//! In-memory [`DomHost`] implementation.

use std::sync::Mutex;

use tracing::{debug, trace};

use themekit_core::error::AppError;
use themekit_core::result::AppResult;

use crate::host::{DomHost, MutationObserver, MutationRecord, NodeId};
use crate::html::{ParsedNode, escape_attr, is_void, parse_fragment};
use crate::selector::{ElementView, Selector};

/// A script that ran because a DOM-created script element was attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedScript {
    /// The script element.
    pub node: NodeId,
    /// Its attributes at execution time.
    pub attributes: Vec<(String, String)>,
    /// Its inline source.
    pub text: String,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        /// Inserted by the markup parser; such scripts never run.
        parser_inserted: bool,
        /// A script that has already run.
        started: bool,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<NodeData>,
    executed: Vec<ExecutedScript>,
}

const ROOT: NodeId = NodeId(0);

impl Arena {
    fn node(&self, id: NodeId) -> AppResult<&NodeData> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| AppError::dom(format!("Unknown node {id}")))
    }

    fn node_mut(&mut self, id: NodeId) -> AppResult<&mut NodeData> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| AppError::dom(format!("Unknown node {id}")))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn is_element(&self, id: NodeId) -> bool {
        matches!(
            self.nodes.get(id.0).map(|n| &n.kind),
            Some(NodeKind::Element { .. })
        )
    }

    fn detach(&mut self, id: NodeId) -> AppResult<()> {
        if let Some(parent) = self.node(id)?.parent {
            self.node_mut(parent)?.children.retain(|c| *c != id);
            self.node_mut(id)?.parent = None;
        }
        Ok(())
    }

    fn clear_children(&mut self, id: NodeId) -> AppResult<()> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(node.0).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(ROOT, node)
    }

    fn check_container(&self, id: NodeId) -> AppResult<()> {
        match self.node(id)?.kind {
            NodeKind::Document | NodeKind::Element { .. } => Ok(()),
            _ => Err(AppError::dom(format!("Node {id} cannot have children"))),
        }
    }

    fn insert_parsed(&mut self, parent: NodeId, nodes: Vec<ParsedNode>) -> Vec<NodeId> {
        let mut inserted = Vec::with_capacity(nodes.len());
        for parsed in nodes {
            let (kind, children) = match parsed {
                ParsedNode::Element {
                    tag,
                    attrs,
                    children,
                } => (
                    NodeKind::Element {
                        tag,
                        attrs,
                        parser_inserted: true,
                        started: false,
                    },
                    children,
                ),
                ParsedNode::Text(text) => (NodeKind::Text(text), Vec::new()),
                ParsedNode::Comment(text) => (NodeKind::Comment(text), Vec::new()),
            };
            let id = self.alloc(kind);
            self.nodes[id.0].parent = Some(parent);
            self.nodes[parent.0].children.push(id);
            self.insert_parsed(id, children);
            inserted.push(id);
        }
        inserted
    }

    fn descendants(&self, root: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.nodes.get(root.0) {
            for child in &node.children {
                out.push(*child);
                self.descendants(*child, out);
            }
        }
    }

    fn select(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut all = Vec::new();
        self.descendants(root, &mut all);
        all.into_iter()
            .filter(|id| self.is_element(*id))
            .filter(|id| selector.matches(&ArenaView { arena: self, id: *id }))
            .collect()
    }

    fn text_of(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.nodes.get(id.0) {
            match &node.kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Comment(_) => {}
                _ => {
                    for child in &node.children {
                        self.text_of(*child, out);
                    }
                }
            }
        }
    }

    /// Runs every not-yet-started, DOM-created script in the subtree.
    fn run_scripts(&mut self, root: NodeId) {
        if !self.is_connected(root) {
            return;
        }
        let mut subtree = vec![root];
        self.descendants(root, &mut subtree);
        for id in subtree {
            let ready = matches!(
                &self.nodes[id.0].kind,
                NodeKind::Element { tag, parser_inserted: false, started: false, .. } if tag == "script"
            );
            if !ready {
                continue;
            }
            let mut text = String::new();
            self.text_of(id, &mut text);
            if let NodeKind::Element { attrs, started, .. } = &mut self.nodes[id.0].kind {
                *started = true;
                let attributes = attrs.clone();
                debug!(node = %id, "Executing script element");
                self.executed.push(ExecutedScript {
                    node: id,
                    attributes,
                    text,
                });
            }
        }
    }

    fn serialize(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        match &node.kind {
            NodeKind::Document => {
                for child in &node.children {
                    self.serialize(*child, out);
                }
            }
            NodeKind::Element { tag, attrs, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_attr(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                for child in &node.children {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
    }
}

struct ArenaView<'a> {
    arena: &'a Arena,
    id: NodeId,
}

impl ElementView for ArenaView<'_> {
    fn tag(&self) -> &str {
        match &self.arena.nodes[self.id.0].kind {
            NodeKind::Element { tag, .. } => tag,
            _ => "",
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        match &self.arena.nodes[self.id.0].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    fn parent_element(&self) -> Option<Self> {
        let parent = self.arena.nodes[self.id.0].parent?;
        self.arena.is_element(parent).then_some(ArenaView {
            arena: self.arena,
            id: parent,
        })
    }
}

/// A complete document held in memory.
pub struct MemoryDocument {
    /// Node storage.
    arena: Mutex<Arena>,
    /// Registered mutation observers.
    observers: Mutex<Vec<MutationObserver>>,
}

impl std::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocument").finish()
    }
}

impl MemoryDocument {
    /// Creates an empty page with `head` and `body`.
    pub fn new() -> Self {
        Self::from_html("<html><head></head><body></body></html>")
    }

    /// Parses a full page. Scripts present in the source are treated as
    /// already run.
    pub fn from_html(html: &str) -> Self {
        let mut arena = Arena::default();
        let root = arena.alloc(NodeKind::Document);
        arena.insert_parsed(root, parse_fragment(html));
        Self {
            arena: Mutex::new(arena),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// The document node.
    pub fn document(&self) -> NodeId {
        ROOT
    }

    /// Serializes the whole document.
    pub fn html(&self) -> String {
        self.outer_html(ROOT).unwrap_or_default()
    }

    /// Serializes `node` including its own tag.
    pub fn outer_html(&self, node: NodeId) -> AppResult<String> {
        let arena = self.lock()?;
        arena.node(node)?;
        let mut out = String::new();
        arena.serialize(node, &mut out);
        Ok(out)
    }

    /// Serializes the children of `node`.
    pub fn inner_html(&self, node: NodeId) -> AppResult<String> {
        let arena = self.lock()?;
        let mut out = String::new();
        for child in &arena.node(node)?.children {
            arena.serialize(*child, &mut out);
        }
        Ok(out)
    }

    /// Scripts executed so far, in execution order.
    pub fn executed_scripts(&self) -> Vec<ExecutedScript> {
        self.arena
            .lock()
            .map(|arena| arena.executed.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Arena>> {
        self.arena
            .lock()
            .map_err(|_| AppError::dom("Document lock poisoned"))
    }

    fn notify(&self, records: Vec<MutationRecord>) {
        if records.is_empty() {
            return;
        }
        let observers = match self.observers.lock() {
            Ok(observers) => observers.clone(),
            Err(_) => return,
        };
        trace!(records = records.len(), observers = observers.len(), "Delivering mutations");
        for observer in observers {
            observer(&records);
        }
    }

    fn selector(selector: &str) -> AppResult<Selector> {
        Selector::parse(selector)
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DomHost for MemoryDocument {
    fn query_selector(&self, selector: &str) -> AppResult<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    fn query_selector_all(&self, selector: &str) -> AppResult<Vec<NodeId>> {
        let selector = Self::selector(selector)?;
        Ok(self.lock()?.select(ROOT, &selector))
    }

    fn select_within(&self, root: NodeId, selector: &str) -> AppResult<Vec<NodeId>> {
        let selector = Self::selector(selector)?;
        let arena = self.lock()?;
        arena.node(root)?;
        Ok(arena.select(root, &selector))
    }

    fn matches(&self, node: NodeId, selector: &str) -> AppResult<bool> {
        let selector = Self::selector(selector)?;
        let arena = self.lock()?;
        arena.node(node)?;
        Ok(arena.is_element(node) && selector.matches(&ArenaView { arena: &arena, id: node }))
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let arena = self.lock().ok()?;
        match &arena.node(node).ok()?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    fn attributes(&self, node: NodeId) -> AppResult<Vec<(String, String)>> {
        match &self.lock()?.node(node)?.kind {
            NodeKind::Element { attrs, .. } => Ok(attrs.clone()),
            _ => Ok(Vec::new()),
        }
    }

    fn text_content(&self, node: NodeId) -> AppResult<String> {
        let arena = self.lock()?;
        arena.node(node)?;
        let mut out = String::new();
        arena.text_of(node, &mut out);
        Ok(out)
    }

    fn create_element(&self, tag: &str) -> AppResult<NodeId> {
        let tag = tag.trim().to_ascii_lowercase();
        if tag.is_empty() {
            return Err(AppError::dom("Element tag must not be empty"));
        }
        Ok(self.lock()?.alloc(NodeKind::Element {
            tag,
            attrs: Vec::new(),
            parser_inserted: false,
            started: false,
        }))
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> AppResult<()> {
        let mut arena = self.lock()?;
        match &mut arena.node_mut(node)?.kind {
            NodeKind::Element { attrs, .. } => {
                let name = name.to_ascii_lowercase();
                match attrs.iter_mut().find(|(k, _)| *k == name) {
                    Some(existing) => existing.1 = value.to_string(),
                    None => attrs.push((name, value.to_string())),
                }
                Ok(())
            }
            _ => Err(AppError::dom(format!("Node {node} is not an element"))),
        }
    }

    fn set_text(&self, node: NodeId, text: &str) -> AppResult<()> {
        let record = {
            let mut arena = self.lock()?;
            arena.check_container(node)?;
            arena.clear_children(node)?;
            let text_node = arena.alloc(NodeKind::Text(text.to_string()));
            arena.nodes[text_node.0].parent = Some(node);
            arena.nodes[node.0].children.push(text_node);
            MutationRecord {
                target: node,
                added_nodes: vec![text_node],
            }
        };
        self.notify(vec![record]);
        Ok(())
    }

    fn set_inner_html(&self, node: NodeId, html: &str) -> AppResult<()> {
        let record = {
            let mut arena = self.lock()?;
            arena.check_container(node)?;
            arena.clear_children(node)?;
            let added_nodes = arena.insert_parsed(node, parse_fragment(html));
            MutationRecord {
                target: node,
                added_nodes,
            }
        };
        self.notify(vec![record]);
        Ok(())
    }

    fn children(&self, node: NodeId) -> AppResult<Vec<NodeId>> {
        Ok(self.lock()?.node(node)?.children.clone())
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> AppResult<()> {
        let record = {
            let mut arena = self.lock()?;
            arena.check_container(parent)?;
            arena.node(child)?;
            if arena.is_inclusive_ancestor(child, parent) {
                return Err(AppError::dom(format!(
                    "Cannot append node {child} inside itself"
                )));
            }
            arena.detach(child)?;
            arena.nodes[child.0].parent = Some(parent);
            arena.nodes[parent.0].children.push(child);
            arena.run_scripts(child);
            MutationRecord {
                target: parent,
                added_nodes: vec![child],
            }
        };
        self.notify(vec![record]);
        Ok(())
    }

    fn replace_node(&self, old: NodeId, replacement: NodeId) -> AppResult<()> {
        if old == replacement {
            return Ok(());
        }
        let record = {
            let mut arena = self.lock()?;
            arena.node(replacement)?;
            let parent = arena
                .node(old)?
                .parent
                .ok_or_else(|| AppError::dom(format!("Node {old} has no parent")))?;
            if arena.is_inclusive_ancestor(replacement, parent) {
                return Err(AppError::dom(format!(
                    "Cannot move node {replacement} inside itself"
                )));
            }
            arena.detach(replacement)?;
            let index = arena.nodes[parent.0]
                .children
                .iter()
                .position(|c| *c == old)
                .ok_or_else(|| AppError::dom(format!("Node {old} not found under its parent")))?;
            arena.nodes[parent.0].children[index] = replacement;
            arena.nodes[replacement.0].parent = Some(parent);
            arena.nodes[old.0].parent = None;
            arena.run_scripts(replacement);
            MutationRecord {
                target: parent,
                added_nodes: vec![replacement],
            }
        };
        self.notify(vec![record]);
        Ok(())
    }

    fn observe(&self, observer: MutationObserver) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.push(observer);
        }
    }
}
