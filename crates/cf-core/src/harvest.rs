//! Attribute index
//!
//! Remembers every element id and class token already reported to the
//! engine so each one is sent at most once per page.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::dom::Dom;

/// Newly seen identifiers from one harvest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierBatch {
    pub ids: Vec<String>,
    pub classes: Vec<String>,
}

impl IdentifierBatch {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.classes.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len() + self.classes.len()
    }
}

/// De-duplicating sets of seen ids and classes. Never pruned.
#[derive(Debug, Default)]
pub struct AttributeIndex {
    seen_ids: HashSet<String>,
    seen_classes: HashSet<String>,
}

impl AttributeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect unseen ids and classes from newly inserted nodes.
    pub fn harvest<D: Dom>(&mut self, dom: &D, nodes: &[D::Node]) -> IdentifierBatch {
        let mut batch = IdentifierBatch::default();

        for node in nodes {
            if let Some(id) = dom.attribute(node, "id") {
                let id = id.trim();
                if !id.is_empty() && !self.seen_ids.contains(id) {
                    self.seen_ids.insert(id.to_string());
                    batch.ids.push(id.to_string());
                }
            }

            match dom.attribute(node, "class") {
                Some(class) if !class.is_empty() && !class.contains(char::is_whitespace) => {
                    if !self.seen_classes.contains(&class) {
                        self.seen_classes.insert(class.clone());
                        batch.classes.push(class);
                    }
                }
                _ => {
                    let Some(tokens) = dom.class_list(node) else {
                        continue;
                    };
                    for token in tokens.into_iter().rev() {
                        if !self.seen_classes.contains(&token) {
                            self.seen_classes.insert(token.clone());
                            batch.classes.push(token);
                        }
                    }
                }
            }
        }

        batch
    }

    pub fn has_seen_id(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    pub fn has_seen_class(&self, class: &str) -> bool {
        self.seen_classes.contains(class)
    }

    pub fn seen_id_count(&self) -> usize {
        self.seen_ids.len()
    }

    pub fn seen_class_count(&self) -> usize {
        self.seen_classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_ids_and_single_class() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.append_element(root, "div", &[("id", " top "), ("class", "banner")]);
        let mut index = AttributeIndex::new();

        let batch = index.harvest(&doc, &[a]);
        assert_eq!(batch.ids, vec!["top"]);
        assert_eq!(batch.classes, vec!["banner"]);
        assert!(index.has_seen_id("top"));
    }

    #[test]
    fn test_multi_token_class_reversed() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.append_element(root, "div", &[("class", "one two three")]);
        let mut index = AttributeIndex::new();

        let batch = index.harvest(&doc, &[a]);
        assert_eq!(batch.classes, vec!["three", "two", "one"]);
        assert!(batch.ids.is_empty());
    }

    #[test]
    fn test_reported_once() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.append_element(root, "div", &[("id", "x"), ("class", "ad box")]);
        let b = doc.append_element(root, "div", &[("id", "x"), ("class", "box")]);
        let mut index = AttributeIndex::new();

        let first = index.harvest(&doc, &[a]);
        assert_eq!(first.len(), 3);
        let second = index.harvest(&doc, &[a, b]);
        assert!(second.is_empty());
        assert_eq!(index.seen_id_count(), 1);
        assert_eq!(index.seen_class_count(), 2);
    }

    #[test]
    fn test_blank_and_text_nodes_ignored() {
        let mut doc = Document::new();
        let root = doc.root();
        let blank = doc.append_element(root, "div", &[("id", "   "), ("class", "")]);
        let text = doc.append_text(root, "hello");
        let mut index = AttributeIndex::new();

        assert!(index.harvest(&doc, &[blank, text]).is_empty());
    }

    #[test]
    fn test_duplicate_tokens_within_one_node() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.append_element(root, "div", &[("class", "ad  ad")]);
        let mut index = AttributeIndex::new();

        assert_eq!(index.harvest(&doc, &[a]).classes, vec!["ad"]);
    }
}
