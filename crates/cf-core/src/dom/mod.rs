//! DOM abstraction
//!
//! The pipeline only needs a handful of document operations. Hosts provide
//! them through [`Dom`]: the wasm binding wraps the live browser document,
//! and [`memory::Document`] is a self-contained tree used by the CLI, tests
//! and benchmarks.

use std::collections::HashSet;
use std::hash::Hash;

use crate::error::DomError;

pub mod memory;
pub mod selector;

pub use memory::{Document, NodeId};

/// Set of nodes that remembers membership without owning the document.
pub trait NodeSet<N> {
    fn contains(&self, node: &N) -> bool;
    fn insert(&mut self, node: N);
}

impl<N: Eq + Hash> NodeSet<N> for HashSet<N> {
    #[inline]
    fn contains(&self, node: &N) -> bool {
        HashSet::contains(self, node)
    }

    #[inline]
    fn insert(&mut self, node: N) {
        HashSet::insert(self, node);
    }
}

/// Document operations used by the cosmetic filtering pipeline.
///
/// Nodes are cheap handles that compare equal when they refer to the same
/// node. Non-element nodes (text, comments) answer `None` for every
/// attribute.
pub trait Dom {
    type Node: Clone + PartialEq;
    type NodeSet: NodeSet<Self::Node> + Default;

    fn is_element(&self, node: &Self::Node) -> bool;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Class tokens in document order, or `None` when the node has no
    /// class list support.
    fn class_list(&self, node: &Self::Node) -> Option<Vec<String>>;

    fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Rendered text of the subtree.
    fn inner_text(&self, node: &Self::Node) -> String;

    /// All elements in the document matching a selector list, in tree order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Node>, DomError>;

    fn add_class(&mut self, node: &Self::Node, class: &str) -> Result<(), DomError>;

    /// Detach a node from its parent.
    fn remove_node(&mut self, node: &Self::Node) -> Result<(), DomError>;

    /// Start reporting subtree insertions for the whole document.
    fn observe_insertions(&mut self) -> Result<(), DomError>;

    /// Short label for logs, e.g. `div#top.banner`.
    fn describe(&self, node: &Self::Node) -> String {
        let mut label = String::new();
        if let Some(id) = self.attribute(node, "id") {
            label.push('#');
            label.push_str(&id);
        }
        if let Some(classes) = self.class_list(node) {
            for class in classes {
                label.push('.');
                label.push_str(&class);
            }
        }
        if label.is_empty() {
            label.push_str("<node>");
        }
        label
    }
}
