//! Offline replay of a page against a filter list.

use std::fs;
use std::path::Path;

use serde::Serialize;

use cf_core::dom::Document;
use cf_core::{Dom, DomainParser, FilterConfig, PageSession, PartyClassifier};
use cf_engine::loopback::DocumentSession;
use cf_engine::{CosmeticEngine, Loopback, LoopbackReport};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutput {
    pub report: LoopbackReport,
    /// Elements carrying the hide class, in tree order.
    pub hidden: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedNode {
    pub node: String,
    pub first_party: bool,
    pub signals: String,
    pub visited: usize,
}

pub fn load_config(path: Option<&Path>) -> Result<FilterConfig, String> {
    match path {
        Some(path) => FilterConfig::from_path(path).map_err(|e| e.to_string()),
        None => Ok(FilterConfig::default()),
    }
}

pub fn domain_parser(psl: Option<&Path>, config: &FilterConfig) -> Result<DomainParser, String> {
    let Some(path) = psl else {
        return Ok(DomainParser::new(config.domain_cache_capacity));
    };
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let list = DomainParser::load_suffix_list(&text).map_err(|e| e.to_string())?;
    log::debug!("Loaded public suffix list from {}", path.display());
    Ok(DomainParser::with_suffix_list(list, config.domain_cache_capacity))
}

/// Run the full message loop over `doc` and collect what ended up hidden.
pub fn simulate(
    doc: Document,
    engine: &CosmeticEngine,
    host: &str,
    config: FilterConfig,
    parser: DomainParser,
    max_ticks: usize,
) -> Result<SimulationOutput, String> {
    let mut session: DocumentSession =
        PageSession::with_parser(doc, Vec::new(), host, config, parser).map_err(|e| e.to_string())?;

    let report = Loopback::new(engine)
        .with_max_ticks(max_ticks)
        .run(&mut session)
        .map_err(|e| e.to_string())?;
    if report.truncated {
        log::warn!("Stopped after {} ticks with selectors still pending", report.ticks);
    }

    let class = report.session.hide_class.clone().unwrap_or_default();
    let doc = session.dom();
    let hidden = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&node| !class.is_empty() && doc.has_class(node, &class))
        .map(|node| doc.describe(&node))
        .collect();

    Ok(SimulationOutput { report, hidden })
}

/// Classify every element matching `selector` without hiding anything.
pub fn classify(
    doc: &Document,
    selector: &str,
    host: &str,
    config: &FilterConfig,
    parser: DomainParser,
) -> Result<Vec<ClassifiedNode>, String> {
    let mut classifier = PartyClassifier::new(host, parser, config.known_ad_id_prefixes.clone());
    let nodes = doc.query_selector_all(selector).map_err(|e| e.to_string())?;

    Ok(nodes
        .iter()
        .map(|node| {
            let verdict = classifier.classify(doc, node);
            ClassifiedNode {
                node: doc.describe(node),
                first_party: verdict.first_party,
                signals: format!("{:?}", verdict.signals),
                visited: verdict.visited,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::load_html;

    const PAGE: &str = r#"<html><body>
        <div class="cell"><div class="ad-slot"><iframe src="https://ads.adnet.io/f"></iframe></div></div>
        <div class="cell"><div class="ad-slot">Local news</div></div>
        <div class="cell"><div id="div-gpt-ad-1"></div></div>
    </body></html>"#;

    #[test]
    fn test_simulate_hides_third_party() {
        let doc = load_html(PAGE).unwrap();
        let engine = CosmeticEngine::from_list("##.ad-slot\n", 7);
        let config = FilterConfig::default();
        let parser = DomainParser::new(config.domain_cache_capacity);

        let output = simulate(doc, &engine, "news.example.com", config, parser, 100).unwrap();
        assert_eq!(output.hidden.len(), 1);
        assert!(output.hidden[0].starts_with("div.ad-slot"));
        assert_eq!(output.report.session.queue.first_party_kept, 1);
        assert!(!output.report.truncated);
    }

    #[test]
    fn test_classify_reports_signals() {
        let doc = load_html(PAGE).unwrap();
        let config = FilterConfig::default();
        let parser = DomainParser::new(config.domain_cache_capacity);

        let nodes = classify(&doc, ".ad-slot, #div-gpt-ad-1", "news.example.com", &config, parser).unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(!nodes[0].first_party);
        assert!(nodes[0].signals.contains("THIRD_PARTY_RESOURCE"));
        assert!(nodes[1].first_party);
        assert!(!nodes[2].first_party);
        assert!(nodes[2].signals.contains("KNOWN_THIRD_PARTY_AD"));
    }

    #[test]
    fn test_classify_rejects_bad_selector() {
        let doc = load_html(PAGE).unwrap();
        let config = FilterConfig::default();
        let parser = DomainParser::new(config.domain_cache_capacity);
        assert!(classify(&doc, "div >", "example.com", &config, parser).is_err());
    }
}
