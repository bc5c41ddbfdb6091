//! [`Dom`] over the live browser document.

use js_sys::WeakSet;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, MutationObserver, MutationObserverInit, MutationRecord, Node};

use cf_core::{Dom, DomError, NodeSet};

/// Receives the nodes added by one batch of mutation records.
pub type InsertionHandler = fn(Vec<Node>);

type ObserverCallback = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

/// Hidden-node set that does not keep nodes alive.
pub struct WeakNodeSet(WeakSet);

impl Default for WeakNodeSet {
    fn default() -> Self {
        Self(WeakSet::new())
    }
}

impl NodeSet<Node> for WeakNodeSet {
    fn contains(&self, node: &Node) -> bool {
        self.0.has(node.as_ref())
    }

    fn insert(&mut self, node: Node) {
        self.0.add(node.as_ref());
    }
}

pub struct WebDom {
    document: Document,
    on_insert: InsertionHandler,
    observer: Option<(MutationObserver, ObserverCallback)>,
}

impl WebDom {
    pub fn new(document: Document, on_insert: InsertionHandler) -> Self {
        Self {
            document,
            on_insert,
            observer: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl Drop for WebDom {
    fn drop(&mut self) {
        if let Some((observer, _callback)) = self.observer.take() {
            observer.disconnect();
        }
    }
}

fn host_error(err: JsValue) -> DomError {
    DomError::Host(format!("{:?}", err))
}

impl Dom for WebDom {
    type Node = Node;
    type NodeSet = WeakNodeSet;

    fn is_element(&self, node: &Node) -> bool {
        node.node_type() == Node::ELEMENT_NODE
    }

    fn attribute(&self, node: &Node, name: &str) -> Option<String> {
        node.dyn_ref::<Element>()?.get_attribute(name)
    }

    fn class_list(&self, node: &Node) -> Option<Vec<String>> {
        let list = node.dyn_ref::<Element>()?.class_list();
        Some((0..list.length()).filter_map(|i| list.item(i)).collect())
    }

    fn first_child(&self, node: &Node) -> Option<Node> {
        node.first_child()
    }

    fn next_sibling(&self, node: &Node) -> Option<Node> {
        node.next_sibling()
    }

    fn inner_text(&self, node: &Node) -> String {
        match node.dyn_ref::<HtmlElement>() {
            Some(element) => element.inner_text(),
            None => node.text_content().unwrap_or_default(),
        }
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, DomError> {
        let list = self
            .document
            .query_selector_all(selector)
            .map_err(|err| DomError::invalid_selector(selector, format!("{:?}", err)))?;
        Ok((0..list.length()).filter_map(|i| list.get(i)).collect())
    }

    fn add_class(&mut self, node: &Node, class: &str) -> Result<(), DomError> {
        let element = node.dyn_ref::<Element>().ok_or(DomError::Unsupported)?;
        element.class_list().add_1(class).map_err(host_error)
    }

    fn remove_node(&mut self, node: &Node) -> Result<(), DomError> {
        let parent = node.parent_node().ok_or(DomError::Detached)?;
        parent.remove_child(node).map_err(host_error)?;
        Ok(())
    }

    fn observe_insertions(&mut self) -> Result<(), DomError> {
        if self.observer.is_some() {
            return Ok(());
        }
        let target = self
            .document
            .document_element()
            .ok_or_else(|| DomError::Host("document has no root element".to_string()))?;

        let on_insert = self.on_insert;
        let callback: ObserverCallback = Closure::new(move |records: js_sys::Array, _observer: MutationObserver| {
            let mut added = Vec::new();
            for record in records.iter() {
                let record: MutationRecord = record.unchecked_into();
                let nodes = record.added_nodes();
                added.extend((0..nodes.length()).filter_map(|i| nodes.get(i)));
            }
            if !added.is_empty() {
                on_insert(added);
            }
        });

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(host_error)?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer.observe_with_options(&target, &init).map_err(host_error)?;

        self.observer = Some((observer, callback));
        Ok(())
    }

    fn describe(&self, node: &Node) -> String {
        let mut label = node.node_name().to_lowercase();
        if let Some(element) = node.dyn_ref::<Element>() {
            let id = element.id();
            if !id.is_empty() {
                label.push('#');
                label.push_str(&id);
            }
        }
        label
    }
}
