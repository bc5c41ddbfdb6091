//! Generic hide rule index
//!
//! Keyed rules live in per-kind maps from token hash to rule slots. A hash
//! hit is confirmed against the stored token, so colliding tokens never
//! leak each other's selectors.

use std::collections::{HashMap, HashSet};

use cf_core::IdentifierBatch;

use crate::hash::hash_token;
use crate::parser::{CosmeticRule, RuleKind, SelectorKey};

#[derive(Debug, Clone)]
struct Slot {
    token: String,
    selector: String,
}

#[derive(Debug, Default)]
pub struct GenericRuleIndex {
    by_id: HashMap<u32, Vec<Slot>>,
    by_class: HashMap<u32, Vec<Slot>>,
    unkeyed: Vec<String>,
    exceptions: HashSet<String>,
    hide_rules: usize,
}

impl GenericRuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: &[CosmeticRule]) -> Self {
        let mut index = Self::new();
        for rule in rules {
            index.insert(rule);
        }
        index
    }

    pub fn insert(&mut self, rule: &CosmeticRule) {
        if rule.kind == RuleKind::Exception {
            self.exceptions.insert(rule.selector.clone());
            return;
        }

        self.hide_rules += 1;
        let (map, token) = match &rule.key {
            Some(SelectorKey::Id(token)) => (&mut self.by_id, token),
            Some(SelectorKey::Class(token)) => (&mut self.by_class, token),
            None => {
                self.unkeyed.push(rule.selector.clone());
                return;
            }
        };

        let slots = map.entry(hash_token(token)).or_default();
        if !slots.iter().any(|slot| slot.selector == rule.selector) {
            slots.push(Slot {
                token: token.clone(),
                selector: rule.selector.clone(),
            });
        }
    }

    /// Hide selectors keyed by the reported ids and classes, without
    /// duplicates or excepted selectors, in report order.
    pub fn hide_rules_for(&self, batch: &IdentifierBatch) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut selectors = Vec::new();

        let lookups = batch
            .ids
            .iter()
            .map(|id| (&self.by_id, id))
            .chain(batch.classes.iter().map(|class| (&self.by_class, class)));

        for (map, token) in lookups {
            let Some(slots) = map.get(&hash_token(token)) else {
                continue;
            };
            for slot in slots {
                if slot.token != *token || self.exceptions.contains(&slot.selector) {
                    continue;
                }
                if seen.insert(slot.selector.as_str()) {
                    selectors.push(slot.selector.clone());
                }
            }
        }

        selectors
    }

    /// Generic hide selectors with no leading id or class, minus exceptions.
    pub fn unkeyed_rules(&self) -> Vec<String> {
        self.unkeyed
            .iter()
            .filter(|selector| !self.exceptions.contains(*selector))
            .cloned()
            .collect()
    }

    pub fn is_excepted(&self, selector: &str) -> bool {
        self.exceptions.contains(selector)
    }

    /// Generic hide rules inserted, keyed or not.
    pub fn len(&self) -> usize {
        self.hide_rules
    }

    pub fn is_empty(&self) -> bool {
        self.hide_rules == 0
    }

    pub fn exception_count(&self) -> usize {
        self.exceptions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_cosmetic_list;

    fn index(list: &str) -> GenericRuleIndex {
        let (rules, _) = parse_cosmetic_list(list);
        GenericRuleIndex::from_rules(&rules)
    }

    fn batch(ids: &[&str], classes: &[&str]) -> IdentifierBatch {
        IdentifierBatch {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            classes: classes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_lookup_by_id_and_class() {
        let index = index("###top-ad\n##.banner\n##.banner > img\n##.other");
        let rules = index.hide_rules_for(&batch(&["top-ad"], &["banner"]));
        assert_eq!(rules, vec!["#top-ad", ".banner", ".banner > img"]);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_id_and_class_namespaces_are_separate() {
        let index = index("###promo");
        assert!(index.hide_rules_for(&batch(&[], &["promo"])).is_empty());
        assert_eq!(index.hide_rules_for(&batch(&["promo"], &[])), vec!["#promo"]);
    }

    #[test]
    fn test_exceptions_removed() {
        let index = index("##.banner\n##.banner.big\n#@#.banner\n##div.ad\n#@#div.ad");
        assert_eq!(index.hide_rules_for(&batch(&[], &["banner"])), vec![".banner.big"]);
        assert!(index.is_excepted(".banner"));
        assert!(index.unkeyed_rules().is_empty());
        assert_eq!(index.exception_count(), 2);
    }

    #[test]
    fn test_duplicates_collapsed() {
        let index = index("##.a\n##.a\n##.a.b");
        let rules = index.hide_rules_for(&batch(&[], &["a", "b", "a"]));
        assert_eq!(rules, vec![".a", ".a.b"]);
    }

    #[test]
    fn test_unkeyed() {
        let index = index("##div[id^=\"ad-\"]\n##.x");
        assert_eq!(index.unkeyed_rules(), vec!["div[id^=\"ad-\"]"]);
        assert!(index.hide_rules_for(&batch(&["ad-1"], &[])).is_empty());
    }
}
