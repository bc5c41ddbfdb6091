//! First-party / third-party subtree classification
//!
//! Generic cosmetic selectors such as `.ad-banner` also match legitimate
//! page content. Before hiding a match, the classifier inspects the subtree
//! for signals of where its content comes from:
//!
//!   - any first-party resource makes the subtree first party;
//!   - a subtree with no remote resources is first party when it renders text;
//!   - otherwise it is third party.
//!
//! `url(` or `//` inside a `style` attribute and an empty `srcdoc` count as
//! third-party resources. Ids with well-known ad container prefixes end the
//! walk immediately as third party.

use crate::config::FilterConfig;
use crate::dom::Dom;
use crate::domain::{DomainParser, ParsedDomain};
use crate::url::is_relative_reference;

bitflags::bitflags! {
    /// Signals collected while walking a subtree.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PartySignals: u8 {
        /// A resource on the page's registrable domain.
        const FIRST_PARTY_RESOURCE = 1 << 0;
        /// A resource from elsewhere, or an inline pattern ads use.
        const THIRD_PARTY_RESOURCE = 1 << 1;
        /// An id only ad containers use.
        const KNOWN_THIRD_PARTY_AD = 1 << 2;
    }
}

/// Outcome of classifying one subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// True when the subtree should stay visible.
    pub first_party: bool,
    pub signals: PartySignals,
    /// Nodes inspected before a verdict was reached.
    pub visited: usize,
}

/// Classifies subtrees relative to the page's registrable domain.
pub struct PartyClassifier {
    page_host: String,
    page: Option<ParsedDomain>,
    parser: DomainParser,
    known_ad_prefixes: Vec<String>,
}

impl PartyClassifier {
    pub fn new(page_host: &str, mut parser: DomainParser, known_ad_prefixes: Vec<String>) -> Self {
        let page = parser.parse(page_host);
        if page.is_none() {
            log::debug!("Unable to determine registrable domain of page \"{}\"", page_host);
        }
        Self {
            page_host: page_host.to_string(),
            page,
            parser,
            known_ad_prefixes,
        }
    }

    pub fn from_config(page_host: &str, config: &FilterConfig) -> Self {
        Self::new(
            page_host,
            DomainParser::new(config.domain_cache_capacity),
            config.known_ad_id_prefixes.clone(),
        )
    }

    pub fn page_host(&self) -> &str {
        &self.page_host
    }

    pub fn page_domain(&self) -> Option<&ParsedDomain> {
        self.page.as_ref()
    }

    /// Whether a resource URL belongs to the page's registrable domain.
    /// Anything whose partiness cannot be determined counts as first party.
    pub fn is_first_party_url(&mut self, url: &str) -> bool {
        if is_relative_reference(url) {
            return true;
        }

        let Some(page) = &self.page else {
            log::debug!("Unable to determine party-ness of \"{}\" on \"{}\"", url, self.page_host);
            return true;
        };

        match self.parser.parse(url) {
            Some(target) => page.same_site(&target),
            None => {
                log::debug!("Unable to determine party-ness of \"{}\"", url);
                true
            }
        }
    }

    /// Whether an element id marks a known third-party ad container.
    pub fn is_known_ad_id(&self, id: &str) -> bool {
        self.known_ad_prefixes.iter().any(|prefix| id.starts_with(prefix.as_str()))
    }

    /// Signals contributed by a single node, checked in a fixed order. A
    /// known ad id or a first-party `src` is returned alone since either
    /// ends the walk.
    pub fn node_signals<D: Dom>(&mut self, dom: &D, node: &D::Node) -> PartySignals {
        let mut signals = PartySignals::empty();
        if !dom.is_element(node) {
            return signals;
        }

        if let Some(id) = dom.attribute(node, "id") {
            if self.is_known_ad_id(&id) {
                return PartySignals::KNOWN_THIRD_PARTY_AD;
            }
        }

        if let Some(src) = dom.attribute(node, "src") {
            if self.is_first_party_url(&src) {
                return PartySignals::FIRST_PARTY_RESOURCE;
            }
            signals |= PartySignals::THIRD_PARTY_RESOURCE;
        }

        if let Some(style) = dom.attribute(node, "style") {
            if style.contains("url(") || style.contains("//") {
                signals |= PartySignals::THIRD_PARTY_RESOURCE;
            }
        }

        if let Some(srcdoc) = dom.attribute(node, "srcdoc") {
            if srcdoc.trim().is_empty() {
                signals |= PartySignals::THIRD_PARTY_RESOURCE;
            }
        }

        signals
    }

    /// Classify the subtree rooted at `node`.
    ///
    /// The walk follows first-child and next-sibling links from `node`, so
    /// the siblings after `node` take part as well. It stops at the first
    /// known ad id (third party) or first-party resource (first party).
    /// When neither occurs, the subtree is first party only if it carries no
    /// third-party resource and `node` itself renders text; the text check
    /// applies to `node` alone, never to nodes reached by the walk.
    pub fn classify<D: Dom>(&mut self, dom: &D, node: &D::Node) -> Classification {
        let mut signals = PartySignals::empty();
        let mut visited = 0;
        let mut stack = vec![node.clone()];

        while let Some(current) = stack.pop() {
            visited += 1;
            let snapshot = self.node_signals(dom, &current);
            signals |= snapshot;

            if snapshot.contains(PartySignals::KNOWN_THIRD_PARTY_AD) {
                return Classification { first_party: false, signals, visited };
            }
            if snapshot.contains(PartySignals::FIRST_PARTY_RESOURCE) {
                return Classification { first_party: true, signals, visited };
            }

            // Pushed in reverse so the first child is visited before the sibling.
            if let Some(next) = dom.next_sibling(&current) {
                stack.push(next);
            }
            if let Some(child) = dom.first_child(&current) {
                stack.push(child);
            }
        }

        let first_party = !signals.contains(PartySignals::THIRD_PARTY_RESOURCE)
            && !dom.inner_text(node).trim().is_empty();

        Classification { first_party, signals, visited }
    }

    /// True = first party (keep), false = third party (hide candidate).
    #[inline]
    pub fn is_first_party_subtree<D: Dom>(&mut self, dom: &D, node: &D::Node) -> bool {
        self.classify(dom, node).first_party
    }
}
