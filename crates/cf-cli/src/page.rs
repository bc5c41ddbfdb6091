//! HTML pages loaded into the in-memory document.

use std::fs;
use std::path::Path;

use html5ever::tendril::TendrilSink as _;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use cf_core::dom::{Document, NodeId};

pub fn read_page(path: &Path) -> Result<Document, String> {
    let html = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    load_html(&html)
}

pub fn load_html(html: &str) -> Result<Document, String> {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            exact_errors: false,
            scripting_enabled: false,
            ..TreeBuilderOpts::default()
        },
        ..ParseOpts::default()
    };

    let dom = parse_document(RcDom::default(), opts)
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| format!("Failed to parse HTML: {}", e))?;

    let mut doc = Document::new();
    let root = doc.root();
    copy_tree(&dom.document, root, &mut doc);
    Ok(doc)
}

fn copy_tree(handle: &Handle, parent: NodeId, doc: &mut Document) {
    match &handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                copy_tree(child, parent, doc);
            }
        }
        NodeData::Element { name, attrs, .. } => {
            let element = doc.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                doc.set_attribute(element, &attr.name.local, &attr.value);
            }
            doc.append_child(parent, element);
            for child in handle.children.borrow().iter() {
                copy_tree(child, element, doc);
            }
        }
        NodeData::Text { contents } => {
            doc.append_text(parent, &contents.borrow());
        }
        NodeData::Comment { contents } => {
            let comment = doc.create_comment(contents);
            doc.append_child(parent, comment);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_core::Dom;

    #[test]
    fn test_load_html() {
        let doc = load_html(
            r#"<!doctype html><html><body><div id="top" class="a b">Hi<!-- c --></div><img src="/x.png"></body></html>"#,
        )
        .unwrap();

        let top = doc.query_selector_all("#top").unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(doc.get_attribute(top[0], "class"), Some("a b"));
        assert_eq!(doc.text_content(top[0]), "Hi");
        assert_eq!(doc.query_selector_all("body > img[src]").unwrap().len(), 1);
        assert_eq!(doc.tag_name(doc.document_element().unwrap()), Some("html"));
    }

    #[test]
    fn test_implied_elements() {
        let doc = load_html("<p class=ad>text").unwrap();
        assert_eq!(doc.query_selector_all("html > body > p.ad").unwrap().len(), 1);
    }
}
