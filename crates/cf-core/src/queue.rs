//! Staged selector hide queue
//!
//! New hide selectors are applied to the live document in small batches,
//! one batch per pump, with a pause between pumps so matching never blocks
//! the page. Content often arrives after its selector does, so every
//! selector is tried in three passes (first, second, final stage) before it
//! is dropped for good.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use serde::Serialize;

use crate::config::FilterConfig;
use crate::dom::{Dom, NodeSet};
use crate::error::DomError;
use crate::party::PartyClassifier;

/// Number of passes a selector gets.
pub const STAGE_COUNT: usize = 3;

/// Result of a pump request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// A pump is already pending; nothing was done.
    Sleeping,
    /// All stages are empty.
    Idle,
    /// One batch was processed; pump again after the delay.
    Scheduled(Duration),
}

/// How a third-party node was hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideAction {
    /// The hide class was added.
    Classed,
    /// The node was detached from its parent.
    Removed,
    /// No hide class was known yet; the node stays visible.
    NoClassName,
}

/// Counters for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pumps: usize,
    pub selectors_processed: usize,
    pub matched: usize,
    pub classified: usize,
    pub first_party_kept: usize,
    pub hidden: usize,
    pub removed: usize,
    pub dropped: usize,
    pub invalid_selectors: usize,
}

/// Hide a third-party subtree: add the hide class, or detach the node when
/// it has no class list.
pub fn hide_subtree<D: Dom>(dom: &mut D, node: &D::Node, class_name: Option<&str>) -> Result<HideAction, DomError> {
    if dom.class_list(node).is_some() {
        return match class_name {
            Some(class) => {
                dom.add_class(node, class)?;
                Ok(HideAction::Classed)
            }
            None => {
                log::error!("Random class name was not initialized yet");
                Ok(HideAction::NoClassName)
            }
        };
    }
    dom.remove_node(node)?;
    Ok(HideAction::Removed)
}

/// Registry, stage queues and hidden-node set for one page.
pub struct HideQueue<D: Dom> {
    registry: HashSet<String>,
    stages: [VecDeque<String>; STAGE_COUNT],
    hidden: D::NodeSet,
    sleeping: bool,
    batch_size: usize,
    interval: Duration,
    stats: QueueStats,
}

impl<D: Dom> HideQueue<D> {
    pub fn new(batch_size: usize, interval: Duration) -> Self {
        Self {
            registry: HashSet::new(),
            stages: Default::default(),
            hidden: D::NodeSet::default(),
            sleeping: false,
            batch_size: batch_size.max(1),
            interval,
            stats: QueueStats::default(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.batch_size, config.pump_interval())
    }

    /// Register selectors and queue the unseen ones for their first pass.
    /// Returns how many were new.
    pub fn consider<I, S>(&mut self, selectors: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for selector in selectors {
            let selector = selector.as_ref();
            if selector.trim().is_empty() || self.registry.contains(selector) {
                continue;
            }
            self.registry.insert(selector.to_string());
            self.stages[0].push_back(selector.to_string());
            added += 1;
        }
        added
    }

    /// Process one batch from the earliest non-empty stage.
    pub fn pump(&mut self, dom: &mut D, classifier: &mut PartyClassifier, class_name: Option<&str>) -> PumpOutcome {
        if self.sleeping {
            return PumpOutcome::Sleeping;
        }

        let Some(stage) = self.stages.iter().position(|queue| !queue.is_empty()) else {
            return PumpOutcome::Idle;
        };

        let take = self.stages[stage].len().min(self.batch_size);
        let batch: Vec<String> = self.stages[stage].drain(..take).collect();

        let matches = self.query_batch(dom, &batch);
        let matched = matches.len();
        let mut hidden = 0;

        for node in matches {
            if self.hidden.contains(&node) {
                continue;
            }

            self.stats.classified += 1;
            if classifier.is_first_party_subtree(dom, &node) {
                self.stats.first_party_kept += 1;
                continue;
            }

            match hide_subtree(dom, &node, class_name) {
                Ok(HideAction::Classed) => {
                    self.stats.hidden += 1;
                    hidden += 1;
                }
                Ok(HideAction::Removed) => {
                    self.stats.removed += 1;
                    hidden += 1;
                }
                Ok(HideAction::NoClassName) => {}
                Err(e) => log::warn!("Failed to hide {}: {}", dom.describe(&node), e),
            }
            self.hidden.insert(node);
        }

        self.stats.pumps += 1;
        self.stats.selectors_processed += batch.len();
        self.stats.matched += matched;

        log::debug!(
            "Pumped stage {} ({} selectors): {} matched, {} hidden",
            stage + 1,
            batch.len(),
            matched,
            hidden
        );

        if stage + 1 < STAGE_COUNT {
            self.stages[stage + 1].extend(batch);
        } else {
            self.stats.dropped += batch.len();
        }

        self.sleeping = true;
        PumpOutcome::Scheduled(self.interval)
    }

    /// Timer expiry: end the pause and pump again.
    pub fn wake(&mut self, dom: &mut D, classifier: &mut PartyClassifier, class_name: Option<&str>) -> PumpOutcome {
        self.sleeping = false;
        self.pump(dom, classifier, class_name)
    }

    /// Run the batch as one combined query. If the host rejects it, fall
    /// back to one query per selector so a single bad selector does not
    /// sink the rest.
    fn query_batch(&mut self, dom: &D, batch: &[String]) -> Vec<D::Node> {
        let combined = batch.join(",");
        match dom.query_selector_all(&combined) {
            Ok(nodes) => nodes,
            Err(_) if batch.len() > 1 => {
                let mut nodes: Vec<D::Node> = Vec::new();
                for selector in batch {
                    match dom.query_selector_all(selector) {
                        Ok(found) => {
                            for node in found {
                                if !nodes.contains(&node) {
                                    nodes.push(node);
                                }
                            }
                        }
                        Err(e) => {
                            self.stats.invalid_selectors += 1;
                            log::warn!("Skipping selector: {}", e);
                        }
                    }
                }
                nodes
            }
            Err(e) => {
                self.stats.invalid_selectors += 1;
                log::warn!("Skipping selector: {}", e);
                Vec::new()
            }
        }
    }

    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_registered(&self, selector: &str) -> bool {
        self.registry.contains(selector)
    }

    /// Selectors waiting in stage `index` (0-based).
    pub fn stage_len(&self, index: usize) -> usize {
        self.stages.get(index).map_or(0, VecDeque::len)
    }

    /// Selectors waiting in any stage.
    pub fn pending(&self) -> usize {
        self.stages.iter().map(VecDeque::len).sum()
    }

    pub fn is_queued(&self, selector: &str) -> bool {
        self.stages.iter().any(|queue| queue.iter().any(|s| s == selector))
    }

    pub fn is_hidden(&self, node: &D::Node) -> bool {
        self.hidden.contains(node)
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }
}
