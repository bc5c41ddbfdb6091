//! In-memory document tree
//!
//! Arena-backed tree with first-child / next-sibling links, mirroring the
//! shape the browser DOM exposes. Used wherever there is no live browser
//! document: the CLI replay, the loopback host, tests and benchmarks.

use std::collections::HashSet;

use crate::dom::selector::SelectorList;
use crate::dom::Dom;
use crate::error::DomError;

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementData {
    fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

/// Elements whose text never renders.
const NON_RENDERED_TAGS: &[&str] = &["script", "style", "template", "noscript"];

/// An in-memory document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    observing: bool,
    insertions: Vec<NodeId>,
    class_lists: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document)],
            observing: false,
            insertions: Vec::new(),
            class_lists: true,
        }
    }

    /// The document node.
    #[inline]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The first element child of the document node (`<html>`).
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .into_iter()
            .find(|&child| self.is_element_node(child))
    }

    /// Number of nodes ever created, attached or not.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Toggle class list support. Without it, hiding falls back to removal.
    pub fn set_class_list_support(&mut self, enabled: bool) {
        self.class_lists = enabled;
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    // =========================================================================
    // Construction
    // =========================================================================

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    /// Set an attribute. Attribute names are case-insensitive.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if let NodeKind::Element(data) = &mut self.nodes[node.0].kind {
            match data.attributes.iter_mut().find(|(key, _)| *key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => data.attributes.push((name, value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let name = name.to_ascii_lowercase();
        if let NodeKind::Element(data) = &mut self.nodes[node.0].kind {
            data.attributes.retain(|(key, _)| *key != name);
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first if
    /// needed. Records an insertion when observing a connected parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child {
            return;
        }
        self.detach(child);

        let last = self.nodes[parent.0].last_child;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        match last {
            Some(last) => self.nodes[last.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);

        if self.observing && self.is_connected(parent) {
            self.insertions.push(child);
        }
    }

    /// Create an element with attributes and append it to `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let element = self.create_element(tag);
        for (name, value) in attributes {
            self.set_attribute(element, name, value);
        }
        self.append_child(parent, element);
        element
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.create_text(text);
        self.append_child(parent, node);
        node
    }

    /// Unlink a node from its parent. The subtree stays intact.
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes[node.0].parent else {
            return;
        };
        let prev = self.nodes[node.0].prev_sibling;
        let next = self.nodes[node.0].next_sibling;

        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = next,
            None => self.nodes[parent.0].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next.0].prev_sibling = prev,
            None => self.nodes[parent.0].last_child = prev,
        }

        let entry = &mut self.nodes[node.0];
        entry.parent = None;
        entry.prev_sibling = None;
        entry.next_sibling = None;
    }

    /// Drain the subtree insertions recorded since the last call.
    pub fn take_insertions(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.insertions)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    #[inline]
    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.0].kind
    }

    #[inline]
    fn is_element_node(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].kind, NodeKind::Element(_))
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element(data) => Some(&data.tag),
            _ => None,
        }
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element(data) => data.get(&name.to_ascii_lowercase()),
            _ => None,
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.get_attribute(node, "class")
            .map(|value| value.split_ascii_whitespace().any(|token| token == class))
            .unwrap_or(false)
    }

    #[inline]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).filter(|&parent| self.is_element_node(parent))
    }

    pub fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.nodes[node.0].prev_sibling;
        while let Some(candidate) = current {
            if self.is_element_node(candidate) {
                return Some(candidate);
            }
            current = self.nodes[candidate.0].prev_sibling;
        }
        None
    }

    pub fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.first_element_from(self.nodes[node.0].next_sibling)
    }

    pub fn first_element_child(&self, node: NodeId) -> Option<NodeId> {
        self.first_element_from(self.nodes[node.0].first_child)
    }

    fn first_element_from(&self, mut current: Option<NodeId>) -> Option<NodeId> {
        while let Some(candidate) = current {
            if self.is_element_node(candidate) {
                return Some(candidate);
            }
            current = self.nodes[candidate.0].next_sibling;
        }
        None
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        let mut current = self.nodes[node.0].first_child;
        while let Some(child) = current {
            children.push(child);
            current = self.nodes[child.0].next_sibling;
        }
        children
    }

    /// True when the node is reachable from the document node.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root() {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    /// Descendants of `node` in tree order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        if let Some(first) = self.nodes[node.0].first_child {
            stack.push(first);
        }
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(next) = self.nodes[current.0].next_sibling {
                stack.push(next);
            }
            if let Some(first) = self.nodes[current.0].first_child {
                stack.push(first);
            }
        }
        out
    }

    /// Concatenated text of the subtree, skipping non-rendered elements.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut text = String::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            match &self.nodes[current.0].kind {
                NodeKind::Text(value) => text.push_str(value),
                NodeKind::Element(data) if NON_RENDERED_TAGS.contains(&data.tag.as_str()) => continue,
                NodeKind::Comment(_) => continue,
                _ => {}
            }
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        text
    }

    /// Elements matching a parsed selector list, in tree order.
    pub fn select(&self, selectors: &SelectorList) -> Vec<NodeId> {
        selectors.select(self)
    }
}

impl Dom for Document {
    type Node = NodeId;
    type NodeSet = HashSet<NodeId>;

    fn is_element(&self, node: &NodeId) -> bool {
        self.is_element_node(*node)
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.get_attribute(*node, name).map(str::to_string)
    }

    fn class_list(&self, node: &NodeId) -> Option<Vec<String>> {
        if !self.class_lists || !self.is_element_node(*node) {
            return None;
        }
        Some(
            self.get_attribute(*node, "class")
                .map(|value| value.split_ascii_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        )
    }

    fn first_child(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes[node.0].first_child
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes[node.0].next_sibling
    }

    fn inner_text(&self, node: &NodeId) -> String {
        self.text_content(*node)
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selectors = SelectorList::parse(selector)?;
        Ok(self.select(&selectors))
    }

    fn add_class(&mut self, node: &NodeId, class: &str) -> Result<(), DomError> {
        if !self.class_lists || !self.is_element_node(*node) {
            return Err(DomError::Unsupported);
        }
        if self.has_class(*node, class) {
            return Ok(());
        }
        let value = match self.get_attribute(*node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim_end(), class),
            _ => class.to_string(),
        };
        self.set_attribute(*node, "class", &value);
        Ok(())
    }

    fn remove_node(&mut self, node: &NodeId) -> Result<(), DomError> {
        if self.parent(*node).is_none() {
            return Err(DomError::Detached);
        }
        self.detach(*node);
        Ok(())
    }

    fn observe_insertions(&mut self) -> Result<(), DomError> {
        self.observing = true;
        Ok(())
    }

    fn describe(&self, node: &NodeId) -> String {
        let mut label = match self.tag_name(*node) {
            Some(tag) => tag.to_string(),
            None => return "#text".to_string(),
        };
        if let Some(id) = self.get_attribute(*node, "id") {
            label.push('#');
            label.push_str(id);
        }
        if let Some(class) = self.get_attribute(*node, "class") {
            for token in class.split_ascii_whitespace() {
                label.push('.');
                label.push_str(token);
            }
        }
        label
    }
}
