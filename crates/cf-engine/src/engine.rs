//! Cosmetic engine message handler
//!
//! Stands in for the native filter engine. `contentScriptsLoaded` gets the
//! randomized hide class plus the unkeyed generic rules, and each
//! `classIdStylesheet` batch gets the keyed rules its ids and classes select.

use std::path::Path;

use cf_core::{IdentifierBatch, InboundMessage, OutboundMessage};

use crate::error::EngineError;
use crate::hash::randomized_class_name;
use crate::index::GenericRuleIndex;
use crate::parser::{parse_cosmetic_list, ParseStats};

/// Answers content script messages from a parsed filter list.
pub struct CosmeticEngine {
    index: GenericRuleIndex,
    stats: ParseStats,
    class_name: String,
}

impl CosmeticEngine {
    /// Build from filter list text. `seed` picks the randomized hide class.
    pub fn from_list(text: &str, seed: u64) -> Self {
        let (rules, stats) = parse_cosmetic_list(text);
        let index = GenericRuleIndex::from_rules(&rules);
        log::info!(
            "Loaded {} generic hide rules, {} exceptions ({} lines)",
            stats.generic_hide,
            stats.generic_exceptions,
            stats.lines
        );
        Self {
            index,
            stats,
            class_name: randomized_class_name(seed),
        }
    }

    pub fn from_path(path: &Path, seed: u64) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_list(&text, seed))
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn index(&self) -> &GenericRuleIndex {
        &self.index
    }

    /// Class the page should add to hidden elements.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn hide_rules_for(&self, batch: &IdentifierBatch) -> Vec<String> {
        self.index.hide_rules_for(batch)
    }

    /// Replies to one outbound page message, in delivery order.
    ///
    /// `contentScriptsLoaded` is answered with the generic exceptions
    /// message, followed by the unkeyed generic rules if there are any.
    /// `classIdStylesheet` is answered with the keyed rules it selects.
    pub fn respond(&self, message: &OutboundMessage) -> Vec<InboundMessage> {
        match message {
            OutboundMessage::ContentScriptsLoaded => {
                let mut replies = vec![InboundMessage::GenericExceptions {
                    randomized_class_name: Some(self.class_name.clone()),
                }];
                let unkeyed = self.index.unkeyed_rules();
                if !unkeyed.is_empty() {
                    replies.push(InboundMessage::ConsiderNewRules { hide_rules: unkeyed });
                }
                replies
            }
            OutboundMessage::ClassIdStylesheet { classes, ids } => {
                let batch = IdentifierBatch {
                    ids: ids.clone(),
                    classes: classes.clone(),
                };
                let hide_rules = self.hide_rules_for(&batch);
                if hide_rules.is_empty() {
                    Vec::new()
                } else {
                    vec![InboundMessage::ConsiderNewRules { hide_rules }]
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loaded_reply() {
        let engine = CosmeticEngine::from_list("##.ad\n##div[data-ad]", 7);
        let replies = engine.respond(&OutboundMessage::ContentScriptsLoaded);
        assert_eq!(replies.len(), 2);
        assert_eq!(
            replies[0],
            InboundMessage::GenericExceptions {
                randomized_class_name: Some(randomized_class_name(7))
            }
        );
        assert_eq!(
            replies[1],
            InboundMessage::ConsiderNewRules {
                hide_rules: vec!["div[data-ad]".to_string()]
            }
        );
    }

    #[test]
    fn test_class_id_reply() {
        let engine = CosmeticEngine::from_list("##.ad\n###slot", 7);
        let message = OutboundMessage::ClassIdStylesheet {
            classes: vec!["ad".into(), "story".into()],
            ids: vec!["slot".into()],
        };
        assert_eq!(
            engine.respond(&message),
            vec![InboundMessage::ConsiderNewRules {
                hide_rules: vec!["#slot".to_string(), ".ad".to_string()]
            }]
        );

        let nothing = OutboundMessage::ClassIdStylesheet {
            classes: vec!["story".into()],
            ids: vec![],
        };
        assert!(engine.respond(&nothing).is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = CosmeticEngine::from_path(Path::new("/nonexistent/list.txt"), 1);
        assert!(matches!(result, Err(EngineError::Io { .. })));
    }
}
