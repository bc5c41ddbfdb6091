//! Selector matching for the in-memory document
//!
//! Selector lists are parsed and matched by the `selectors` crate, so
//! structural pseudo-classes such as `:not()`, `:is()`, `:nth-child()` and
//! `:first-child` behave as they do under `querySelectorAll`. [`ElementRef`]
//! adapts [`Document`] nodes to [`selectors::Element`].

use std::borrow::Borrow;
use std::fmt;

use cssparser::{CowRcStr, ParseError, Parser as CssParser, ParserInput, SourceLocation, ToCss};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::matching::{
    matches_selector, ElementSelectorFlags, IgnoreNthChildForInvalidation, MatchingContext, MatchingMode,
    NeedsSelectorFlags, QuirksMode,
};
use selectors::parser::{self, ParseRelative, SelectorParseErrorKind};
use selectors::{Element, NthIndexCache, OpaqueElement};

use crate::dom::memory::{Document, NodeId, NodeKind};
use crate::error::DomError;

/// Form controls that can be enabled or disabled.
const FORM_CONTROL_TAGS: &[&str] = &["button", "input", "select", "textarea", "option", "optgroup", "fieldset"];

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone)]
pub struct SelectorList(parser::SelectorList<CosmeticSelectors>);

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let mut parser_input = ParserInput::new(input);
        let mut css = CssParser::new(&mut parser_input);
        parser::SelectorList::parse(&SelectorParser, &mut css, ParseRelative::No)
            .map(Self)
            .map_err(|err| DomError::invalid_selector(input, format!("{:?}", err.kind)))
    }

    pub fn len(&self) -> usize {
        self.0 .0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0 .0.is_empty()
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(element) = ElementRef::new(doc, node) else {
            return false;
        };
        let mut nth_index_cache = NthIndexCache::default();
        let mut context = matching_context(&mut nth_index_cache);
        self.matches_in(&element, &mut context)
    }

    /// Elements of `doc` matching the list, in tree order.
    pub fn select(&self, doc: &Document) -> Vec<NodeId> {
        let mut nth_index_cache = NthIndexCache::default();
        let mut context = matching_context(&mut nth_index_cache);
        doc.descendants(doc.root())
            .into_iter()
            .filter(|&node| {
                ElementRef::new(doc, node).is_some_and(|element| self.matches_in(&element, &mut context))
            })
            .collect()
    }

    fn matches_in(&self, element: &ElementRef<'_>, context: &mut MatchingContext<'_, CosmeticSelectors>) -> bool {
        self.0 .0.iter().any(|selector| matches_selector(selector, 0, None, element, context))
    }
}

fn matching_context(nth_index_cache: &mut NthIndexCache) -> MatchingContext<'_, CosmeticSelectors> {
    MatchingContext::new(
        MatchingMode::Normal,
        None,
        nth_index_cache,
        QuirksMode::NoQuirks,
        NeedsSelectorFlags::No,
        IgnoreNthChildForInvalidation::No,
    )
}

// =============================================================================
// Element adapter
// =============================================================================

/// An element of a [`Document`], as seen by the selector engine.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    node: NodeId,
}

impl<'a> ElementRef<'a> {
    /// `None` unless `node` is an element.
    pub fn new(doc: &'a Document, node: NodeId) -> Option<Self> {
        doc.tag_name(node).map(|_| Self { doc, node })
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    fn wrap(&self, node: Option<NodeId>) -> Option<Self> {
        node.and_then(|node| Self::new(self.doc, node))
    }

    fn tag(&self) -> &'a str {
        self.doc.tag_name(self.node).unwrap_or_default()
    }

    fn attr(&self, name: &str) -> Option<&'a str> {
        self.doc.get_attribute(self.node, name)
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef").field("node", &self.node).finish_non_exhaustive()
    }
}

impl Element for ElementRef<'_> {
    type Impl = CosmeticSelectors;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.doc.kind(self.node))
    }

    fn parent_element(&self) -> Option<Self> {
        self.wrap(self.doc.parent_element(self.node))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.wrap(self.doc.previous_element_sibling(self.node))
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.wrap(self.doc.next_element_sibling(self.node))
    }

    fn first_element_child(&self) -> Option<Self> {
        self.wrap(self.doc.first_element_child(self.node))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, local_name: &str) -> bool {
        self.tag() == local_name
    }

    fn has_namespace(&self, _ns: &()) -> bool {
        true
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.tag() == other.tag()
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&()>,
        local_name: &CssString,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        if !matches!(ns, NamespaceConstraint::Any | NamespaceConstraint::Specific(())) {
            return false;
        }
        self.attr(local_name.as_ref())
            .is_some_and(|value| operation.eval_str(value))
    }

    fn match_non_ts_pseudo_class(&self, pc: &PseudoClass, _context: &mut MatchingContext<Self::Impl>) -> bool {
        match pc {
            PseudoClass::Link | PseudoClass::AnyLink => self.is_link(),
            PseudoClass::Visited | PseudoClass::Hover | PseudoClass::Active | PseudoClass::Focus => false,
            PseudoClass::Checked => match self.tag() {
                "input" => self.attr("checked").is_some(),
                "option" => self.attr("selected").is_some(),
                _ => false,
            },
            PseudoClass::Disabled => FORM_CONTROL_TAGS.contains(&self.tag()) && self.attr("disabled").is_some(),
            PseudoClass::Enabled => FORM_CONTROL_TAGS.contains(&self.tag()) && self.attr("disabled").is_none(),
        }
    }

    fn match_pseudo_element(&self, pe: &PseudoElement, _context: &mut MatchingContext<Self::Impl>) -> bool {
        match *pe {}
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        matches!(self.tag(), "a" | "area" | "link") && self.attr("href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        self.tag() == "slot"
    }

    fn has_id(&self, id: &CssString, case_sensitivity: CaseSensitivity) -> bool {
        self.attr("id")
            .is_some_and(|value| case_sensitivity.eq(value.as_bytes(), id.0.as_bytes()))
    }

    fn has_class(&self, name: &CssString, case_sensitivity: CaseSensitivity) -> bool {
        self.attr("class").is_some_and(|classes| {
            classes
                .split_ascii_whitespace()
                .any(|class| case_sensitivity.eq(class.as_bytes(), name.0.as_bytes()))
        })
    }

    fn imported_part(&self, _name: &CssString) -> Option<CssString> {
        None
    }

    fn is_part(&self, _name: &CssString) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.doc.children(self.node).into_iter().all(|child| match self.doc.kind(child) {
            NodeKind::Text(text) => text.is_empty(),
            NodeKind::Comment(_) => true,
            _ => false,
        })
    }

    fn is_root(&self) -> bool {
        self.doc.parent(self.node) == Some(self.doc.root())
    }
}

// =============================================================================
// Selector implementation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosmeticSelectors;

impl parser::SelectorImpl for CosmeticSelectors {
    type ExtraMatchingData<'a> = ();
    type AttrValue = CssString;
    type Identifier = CssString;
    type LocalName = CssString;
    type NamespacePrefix = CssString;
    type NamespaceUrl = ();
    type BorrowedNamespaceUrl = ();
    type BorrowedLocalName = str;
    type NonTSPseudoClass = PseudoClass;
    type PseudoElement = PseudoElement;
}

/// State pseudo-classes. A static document has no user interaction, so
/// the interaction states never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoClass {
    Link,
    AnyLink,
    Visited,
    Hover,
    Active,
    Focus,
    Checked,
    Disabled,
    Enabled,
}

impl PseudoClass {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "link" => Self::Link,
            "any-link" => Self::AnyLink,
            "visited" => Self::Visited,
            "hover" => Self::Hover,
            "active" => Self::Active,
            "focus" => Self::Focus,
            "checked" => Self::Checked,
            "disabled" => Self::Disabled,
            "enabled" => Self::Enabled,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::AnyLink => "any-link",
            Self::Visited => "visited",
            Self::Hover => "hover",
            Self::Active => "active",
            Self::Focus => "focus",
            Self::Checked => "checked",
            Self::Disabled => "disabled",
            Self::Enabled => "enabled",
        }
    }
}

impl parser::NonTSPseudoClass for PseudoClass {
    type Impl = CosmeticSelectors;

    fn is_active_or_hover(&self) -> bool {
        matches!(self, Self::Active | Self::Hover)
    }

    fn is_user_action_state(&self) -> bool {
        matches!(self, Self::Active | Self::Hover | Self::Focus)
    }
}

impl ToCss for PseudoClass {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        dest.write_char(':')?;
        dest.write_str(self.name())
    }
}

/// Pseudo-elements never match an element, so none are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoElement {}

impl parser::PseudoElement for PseudoElement {
    type Impl = CosmeticSelectors;
}

impl ToCss for PseudoElement {
    fn to_css<W>(&self, _dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        match *self {}
    }
}

struct SelectorParser;

impl<'i> parser::Parser<'i> for SelectorParser {
    type Impl = CosmeticSelectors;
    type Error = SelectorParseErrorKind<'i>;

    fn parse_is_and_where(&self) -> bool {
        true
    }

    fn parse_non_ts_pseudo_class(
        &self,
        location: SourceLocation,
        name: CowRcStr<'i>,
    ) -> Result<PseudoClass, ParseError<'i, Self::Error>> {
        PseudoClass::from_name(&name)
            .ok_or_else(|| location.new_custom_error(SelectorParseErrorKind::UnsupportedPseudoClassOrElement(name)))
    }
}

/// Identifier, attribute value or name inside a parsed selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CssString(pub String);

impl From<&str> for CssString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for CssString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CssString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl ToCss for CssString {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        cssparser::serialize_string(&self.0, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;

    fn page() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let html = doc.append_element(root, "html", &[]);
        let body = doc.append_element(html, "body", &[("class", "home")]);
        let wrapper = doc.append_element(body, "div", &[("id", "wrap"), ("class", "ad-slot top")]);
        let frame = doc.append_element(
            wrapper,
            "iframe",
            &[("src", "https://ads.example.net/x"), ("data-kind", "Banner-wide")],
        );
        let aside = doc.append_element(body, "aside", &[("class", "sponsored")]);
        (doc, wrapper, frame, aside)
    }

    #[test]
    fn test_simple_selectors() {
        let (doc, wrapper, frame, aside) = page();
        assert_eq!(doc.query_selector_all("#wrap").unwrap(), vec![wrapper]);
        assert_eq!(doc.query_selector_all(".sponsored").unwrap(), vec![aside]);
        assert_eq!(doc.query_selector_all("IFRAME").unwrap(), vec![frame]);
        assert_eq!(doc.query_selector_all("div.ad-slot.top").unwrap(), vec![wrapper]);
        assert!(doc.query_selector_all("div.ad-slot.bottom").unwrap().is_empty());
    }

    #[test]
    fn test_attribute_operators() {
        let (doc, _, frame, _) = page();
        assert_eq!(doc.query_selector_all("[src^=\"https://ads.\"]").unwrap(), vec![frame]);
        assert_eq!(doc.query_selector_all("[src*='example']").unwrap(), vec![frame]);
        assert_eq!(doc.query_selector_all("[src$=x]").unwrap(), vec![frame]);
        assert_eq!(doc.query_selector_all("[data-kind|=Banner]").unwrap(), vec![frame]);
        assert!(doc.query_selector_all("[data-kind=banner-wide]").unwrap().is_empty());
        assert_eq!(doc.query_selector_all("[data-kind=banner-wide i]").unwrap(), vec![frame]);
    }

    #[test]
    fn test_combinators() {
        let (doc, wrapper, frame, aside) = page();
        assert_eq!(doc.query_selector_all("body iframe").unwrap(), vec![frame]);
        assert_eq!(doc.query_selector_all(".home > #wrap").unwrap(), vec![wrapper]);
        assert!(doc.query_selector_all(".home > iframe").unwrap().is_empty());
        assert_eq!(doc.query_selector_all("#wrap + aside").unwrap(), vec![aside]);
        assert_eq!(doc.query_selector_all("div ~ .sponsored").unwrap(), vec![aside]);
    }

    #[test]
    fn test_structural_pseudo_classes() {
        let (doc, wrapper, frame, aside) = page();
        assert_eq!(doc.query_selector_all("div.ad-slot:not(.keep)").unwrap(), vec![wrapper]);
        assert!(doc.query_selector_all("div:not(.top)").unwrap().is_empty());
        assert_eq!(doc.query_selector_all("body > div:nth-child(1)").unwrap(), vec![wrapper]);
        assert_eq!(doc.query_selector_all("body > :last-child").unwrap(), vec![aside]);
        assert_eq!(doc.query_selector_all("iframe:first-child:only-child").unwrap(), vec![frame]);
        assert_eq!(doc.query_selector_all(":is(aside, iframe).sponsored").unwrap(), vec![aside]);
        assert_eq!(doc.query_selector_all("iframe:empty").unwrap(), vec![frame]);
        assert_eq!(doc.query_selector_all(":root").unwrap().len(), 1);
    }

    #[test]
    fn test_state_pseudo_classes() {
        let mut doc = Document::new();
        let root = doc.root();
        let link = doc.append_element(root, "a", &[("href", "/promo")]);
        let anchor = doc.append_element(root, "a", &[]);
        let button = doc.append_element(root, "button", &[("disabled", "")]);

        assert_eq!(doc.query_selector_all("a:link").unwrap(), vec![link]);
        assert_eq!(doc.query_selector_all("a:not(:link)").unwrap(), vec![anchor]);
        assert_eq!(doc.query_selector_all("button:disabled").unwrap(), vec![button]);
        assert!(doc.query_selector_all("a:hover").unwrap().is_empty());
    }

    #[test]
    fn test_id_and_class_list_query() {
        let (doc, wrapper, _, aside) = page();
        let body = doc.parent_element(wrapper).unwrap();
        assert_eq!(doc.query_selector_all("[id],[class]").unwrap(), vec![body, wrapper, aside]);
    }

    #[test]
    fn test_escaped_identifiers() {
        let mut doc = Document::new();
        let root = doc.root();
        let node = doc.append_element(root, "div", &[("class", "a:b"), ("id", "1st")]);
        assert_eq!(doc.query_selector_all(".a\\:b").unwrap(), vec![node]);
        assert_eq!(doc.query_selector_all("#\\31 st").unwrap(), vec![node]);
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in ["", "#", ".a,", "div >", "a::before", "a:-abp-contains(x)", "[src^]", "div!"] {
            let err = SelectorList::parse(bad).unwrap_err();
            assert!(matches!(err, DomError::InvalidSelector { .. }), "{bad:?} should fail");
        }
    }

    #[test]
    fn test_matches_single_node() {
        let (doc, wrapper, frame, _) = page();
        let list = SelectorList::parse("#wrap > iframe:only-child").unwrap();
        assert!(list.matches(&doc, frame));
        assert!(!list.matches(&doc, wrapper));
        assert!(!list.matches(&doc, doc.root()));
    }

    #[test]
    fn test_list_length() {
        let list = SelectorList::parse("#a, .b,div > span").unwrap();
        assert_eq!(list.len(), 3);
    }
}
