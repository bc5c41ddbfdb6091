//! Browser tests for the web-sys document binding.
#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;
use web_sys::{Document, Element, Node};

use cf_core::{Dom, DomError, FilterConfig, NodeSet, PartyClassifier};
use cf_wasm::dom::{WeakNodeSet, WebDom};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

fn ignore_insertions(_nodes: Vec<Node>) {}

fn mount(html: &str) -> Element {
    let doc = document();
    let container = doc.create_element("div").unwrap();
    container.set_inner_html(html);
    doc.body().unwrap().append_child(&container).unwrap();
    container
}

#[wasm_bindgen_test]
fn attributes_and_class_list() {
    let container = mount(r#"<div id="web-a" class="one two">text</div>"#);
    let dom = WebDom::new(document(), ignore_insertions);
    let node: Node = container.first_child().unwrap();

    assert!(dom.is_element(&node));
    assert_eq!(dom.attribute(&node, "id").as_deref(), Some("web-a"));
    assert_eq!(dom.class_list(&node), Some(vec!["one".to_string(), "two".to_string()]));

    let text = node.first_child().unwrap();
    assert!(!dom.is_element(&text));
    assert_eq!(dom.attribute(&text, "id"), None);
    container.remove();
}

#[wasm_bindgen_test]
fn query_add_class_and_remove() {
    let container = mount(r#"<p class="web-b"></p><p class="web-b"></p>"#);
    let mut dom = WebDom::new(document(), ignore_insertions);

    let matches = dom.query_selector_all(".web-b").unwrap();
    assert_eq!(matches.len(), 2);

    dom.add_class(&matches[0], "hidden-x").unwrap();
    assert!(dom.class_list(&matches[0]).unwrap().contains(&"hidden-x".to_string()));

    dom.remove_node(&matches[1]).unwrap();
    assert_eq!(dom.query_selector_all(".web-b").unwrap().len(), 1);
    assert!(matches!(dom.remove_node(&matches[1]), Err(DomError::Detached)));
    container.remove();
}

#[wasm_bindgen_test]
fn invalid_selector_is_an_error() {
    let dom = WebDom::new(document(), ignore_insertions);
    assert!(matches!(
        dom.query_selector_all("##bad"),
        Err(DomError::InvalidSelector { .. })
    ));
}

#[wasm_bindgen_test]
fn weak_node_set_membership() {
    let container = mount("<span></span>");
    let node: Node = container.first_child().unwrap();
    let mut set = WeakNodeSet::default();
    assert!(!set.contains(&node));
    set.insert(node.clone());
    assert!(set.contains(&node));
    assert!(!set.contains(container.as_ref()));
    container.remove();
}

#[wasm_bindgen_test]
fn classifier_over_live_document() {
    let container = mount(
        r#"<div id="div-gpt-ad-9"></div>
           <div class="story"><img src="https://img.example.com/a.png"></div>"#,
    );
    let dom = WebDom::new(document(), ignore_insertions);
    let mut classifier = PartyClassifier::from_config("www.example.com", &FilterConfig::default());

    let ad = dom.query_selector_all("#div-gpt-ad-9").unwrap().remove(0);
    assert!(!classifier.is_first_party_subtree(&dom, &ad));

    let story = dom.query_selector_all(".story").unwrap().remove(0);
    assert!(classifier.is_first_party_subtree(&dom, &story));
    container.remove();
}

#[wasm_bindgen_test]
fn logging_goes_to_console_at_info() {
    cf_wasm::init_logging();
    assert_eq!(log::max_level(), log::LevelFilter::Info);
    log::info!("console logging installed");
}
