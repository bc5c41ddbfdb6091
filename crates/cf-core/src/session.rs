//! Page session
//!
//! One [`PageSession`] per navigation owns every piece of page state: the
//! attribute index, the party classifier, the hide queue and the randomized
//! hide class. The host drives it with three events (inbound messages,
//! inserted nodes, timer expiry) and owns real or virtual time; the session
//! only says when it wants to be woken.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::config::FilterConfig;
use crate::dom::Dom;
use crate::domain::DomainParser;
use crate::error::SessionError;
use crate::harvest::AttributeIndex;
use crate::message::{InboundMessage, OutboundMessage};
use crate::party::PartyClassifier;
use crate::queue::{HideQueue, PumpOutcome, QueueStats};

/// Selector for the sweep run when the mutation subscription is installed.
const INITIAL_SWEEP_SELECTOR: &str = "[id],[class]";

/// Destination for outbound messages.
pub trait MessageSink {
    fn send(&mut self, message: OutboundMessage);
}

impl MessageSink for Vec<OutboundMessage> {
    fn send(&mut self, message: OutboundMessage) {
        self.push(message);
    }
}

/// What the host should do after an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    /// Value for the message's response callback, if it expects one.
    pub reply: Option<Value>,
    /// Schedule `on_timer` after this delay.
    pub wake_after: Option<Duration>,
}

impl Dispatch {
    fn from_outcome(outcome: PumpOutcome) -> Self {
        Self {
            reply: None,
            wake_after: wake_after(outcome),
        }
    }
}

fn wake_after(outcome: PumpOutcome) -> Option<Duration> {
    match outcome {
        PumpOutcome::Scheduled(delay) => Some(delay),
        PumpOutcome::Sleeping | PumpOutcome::Idle => None,
    }
}

/// Summary of a session, returned by [`PageSession::report`] and
/// [`PageSession::teardown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub page_host: String,
    pub observing: bool,
    pub hide_class: Option<String>,
    pub seen_ids: usize,
    pub seen_classes: usize,
    pub registered_selectors: usize,
    pub pending_selectors: usize,
    pub messages_sent: usize,
    pub queue: QueueStats,
}

/// All cosmetic filtering state for one page.
pub struct PageSession<D: Dom, S: MessageSink> {
    dom: D,
    sink: S,
    config: FilterConfig,
    index: AttributeIndex,
    classifier: PartyClassifier,
    queue: HideQueue<D>,
    class_name: Option<String>,
    observing: bool,
    started: bool,
    messages_sent: usize,
}

impl<D: Dom, S: MessageSink> PageSession<D, S> {
    pub fn new(dom: D, sink: S, page_host: &str, config: FilterConfig) -> Result<Self, SessionError> {
        let parser = DomainParser::new(config.domain_cache_capacity);
        Self::with_parser(dom, sink, page_host, config, parser)
    }

    /// Session whose classifier uses the given domain parser, e.g. one
    /// backed by a Public Suffix List.
    pub fn with_parser(
        dom: D,
        sink: S,
        page_host: &str,
        config: FilterConfig,
        parser: DomainParser,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let classifier = PartyClassifier::new(page_host, parser, config.known_ad_id_prefixes.clone());
        let queue = HideQueue::from_config(&config);

        Ok(Self {
            dom,
            sink,
            config,
            index: AttributeIndex::new(),
            classifier,
            queue,
            class_name: None,
            observing: false,
            started: false,
            messages_sent: 0,
        })
    }

    /// Announce the session to the engine. Only the first call sends.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.send(OutboundMessage::ContentScriptsLoaded);
    }

    /// Decode and handle a JSON message.
    pub fn handle_json(&mut self, text: &str) -> Result<Dispatch, SessionError> {
        let message = InboundMessage::from_json(text)?;
        self.handle_message(message)
    }

    /// Decode and handle an already parsed message value.
    pub fn handle_value(&mut self, value: Value) -> Result<Dispatch, SessionError> {
        let message = InboundMessage::from_value(value)?;
        self.handle_message(message)
    }

    pub fn handle_message(&mut self, message: InboundMessage) -> Result<Dispatch, SessionError> {
        match message {
            InboundMessage::GenericExceptions { randomized_class_name } => {
                if !self.observing {
                    self.install(randomized_class_name)?;
                } else {
                    log::debug!("Ignoring repeated generic exceptions message");
                }
                Ok(Dispatch {
                    reply: Some(Value::Null),
                    wake_after: None,
                })
            }
            InboundMessage::ConsiderNewRules { hide_rules } => {
                let added = self.queue.consider(&hide_rules);
                log::debug!("Considering {} new of {} hide rules", added, hide_rules.len());
                Ok(Dispatch::from_outcome(self.pump()))
            }
            InboundMessage::Unknown => Ok(Dispatch::default()),
        }
    }

    /// Harvest newly inserted nodes and report unseen ids and classes.
    /// Returns how many identifiers were reported.
    pub fn on_nodes_added(&mut self, nodes: &[D::Node]) -> usize {
        let batch = self.index.harvest(&self.dom, nodes);
        if batch.is_empty() {
            return 0;
        }
        let reported = batch.len();
        self.send(batch.into());
        reported
    }

    /// The delay requested by a previous dispatch has elapsed.
    pub fn on_timer(&mut self) -> Option<Duration> {
        let class_name = self.class_name.as_deref().or(self.config.hide_class_fallback.as_deref());
        let outcome = self.queue.wake(&mut self.dom, &mut self.classifier, class_name);
        wake_after(outcome)
    }

    /// Sweep existing nodes, subscribe to insertions and keep the hide class.
    fn install(&mut self, randomized_class_name: Option<String>) -> Result<(), SessionError> {
        let existing = self.dom.query_selector_all(INITIAL_SWEEP_SELECTOR)?;
        self.on_nodes_added(&existing);

        self.dom.observe_insertions()?;
        self.observing = true;
        self.class_name = randomized_class_name;

        log::debug!(
            "Observing insertions on {} ({} existing nodes swept)",
            self.classifier.page_host(),
            existing.len()
        );
        Ok(())
    }

    fn pump(&mut self) -> PumpOutcome {
        let class_name = self.class_name.as_deref().or(self.config.hide_class_fallback.as_deref());
        self.queue.pump(&mut self.dom, &mut self.classifier, class_name)
    }

    fn send(&mut self, message: OutboundMessage) {
        self.messages_sent += 1;
        self.sink.send(message);
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn index(&self) -> &AttributeIndex {
        &self.index
    }

    pub fn queue(&self) -> &HideQueue<D> {
        &self.queue
    }

    pub fn classifier(&self) -> &PartyClassifier {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut PartyClassifier {
        &mut self.classifier
    }

    /// Class added to hidden elements, if one is known.
    pub fn hide_class(&self) -> Option<&str> {
        self.class_name.as_deref().or(self.config.hide_class_fallback.as_deref())
    }

    #[inline]
    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            page_host: self.classifier.page_host().to_string(),
            observing: self.observing,
            hide_class: self.hide_class().map(str::to_string),
            seen_ids: self.index.seen_id_count(),
            seen_classes: self.index.seen_class_count(),
            registered_selectors: self.queue.registry_len(),
            pending_selectors: self.queue.pending(),
            messages_sent: self.messages_sent,
            queue: self.queue.stats(),
        }
    }

    /// End the session. All page state is dropped with it.
    pub fn teardown(self) -> SessionReport {
        let report = self.report();
        log::debug!(
            "Session for {} closed: {} hidden, {} removed",
            report.page_host,
            report.queue.hidden,
            report.queue.removed
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, NodeId};

    type Session = PageSession<Document, Vec<OutboundMessage>>;

    fn page() -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let html = doc.append_element(root, "html", &[]);
        let body = doc.append_element(html, "body", &[]);
        doc.append_element(body, "div", &[("id", "header"), ("class", "nav main")]);
        (doc, body)
    }

    fn session(doc: Document) -> Session {
        PageSession::new(doc, Vec::new(), "www.example.com", FilterConfig::default()).unwrap()
    }

    fn init(session: &mut Session) -> Dispatch {
        session
            .handle_json(r#"{"type":"cosmeticFilterGenericExceptions","randomizedClassName":"r4nd"}"#)
            .unwrap()
    }

    #[test]
    fn test_start_sends_loaded_once() {
        let (doc, _) = page();
        let mut s = session(doc);
        s.start();
        s.start();
        assert_eq!(s.sink(), &vec![OutboundMessage::ContentScriptsLoaded]);
    }

    #[test]
    fn test_generic_exceptions_sweeps_and_observes() {
        let (doc, _) = page();
        let mut s = session(doc);

        let dispatch = init(&mut s);
        assert_eq!(dispatch.reply, Some(Value::Null));
        assert!(s.is_observing());
        assert!(s.dom().is_observing());
        assert_eq!(s.hide_class(), Some("r4nd"));
        assert_eq!(
            s.sink(),
            &vec![OutboundMessage::ClassIdStylesheet {
                classes: vec!["main".into(), "nav".into()],
                ids: vec!["header".into()],
            }]
        );
    }

    #[test]
    fn test_generic_exceptions_only_once() {
        let (doc, _) = page();
        let mut s = session(doc);
        init(&mut s);
        let dispatch = s
            .handle_json(r#"{"type":"cosmeticFilterGenericExceptions","randomizedClassName":"other"}"#)
            .unwrap();
        assert_eq!(dispatch.reply, Some(Value::Null));
        assert_eq!(s.hide_class(), Some("r4nd"));
        assert_eq!(s.sink().len(), 1);
    }

    #[test]
    fn test_inserted_nodes_reported_once() {
        let (doc, body) = page();
        let mut s = session(doc);
        init(&mut s);

        let ad = s.dom_mut().append_element(body, "div", &[("id", "slot"), ("class", "ad")]);
        let again = s.dom_mut().append_element(body, "div", &[("class", "ad")]);
        assert_eq!(s.dom_mut().take_insertions(), vec![ad, again]);

        assert_eq!(s.on_nodes_added(&[ad, again]), 2);
        assert_eq!(s.on_nodes_added(&[again]), 0);
        assert_eq!(s.sink().len(), 2);
    }

    #[test]
    fn test_consider_pumps_and_requests_timer() {
        let (doc, body) = page();
        let mut s = session(doc);
        init(&mut s);
        let ad = s.dom_mut().append_element(body, "div", &[("id", "div-gpt-ad-1")]);

        let dispatch = s
            .handle_json(r##"{"type":"cosmeticFilterConsiderNewRules","hideRules":["#div-gpt-ad-1"]}"##)
            .unwrap();
        assert_eq!(dispatch.wake_after, Some(Duration::from_millis(50)));
        assert_eq!(dispatch.reply, None);
        assert!(s.dom().has_class(ad, "r4nd"));

        // A second batch while sleeping waits for the timer.
        let dispatch = s
            .handle_json(r#"{"type":"cosmeticFilterConsiderNewRules","hideRules":[".x"]}"#)
            .unwrap();
        assert_eq!(dispatch.wake_after, None);
        assert_eq!(s.queue().stage_len(0), 1);

        assert_eq!(s.on_timer(), Some(Duration::from_millis(50)));
        assert_eq!(s.queue().stage_len(0), 0);
    }

    #[test]
    fn test_unknown_message_ignored() {
        let (doc, _) = page();
        let mut s = session(doc);
        assert_eq!(s.handle_json(r#""somethingElse""#).unwrap(), Dispatch::default());
        assert!(s.handle_json("not json").is_err());
    }

    #[test]
    fn test_fallback_hide_class() {
        let (doc, body) = page();
        let config = FilterConfig {
            hide_class_fallback: Some("cf-hide".into()),
            ..FilterConfig::default()
        };
        let mut s = PageSession::new(doc, Vec::new(), "www.example.com", config).unwrap();
        let ad = s.dom_mut().append_element(body, "div", &[("id", "adfox_1")]);

        s.handle_json(r##"{"type":"cosmeticFilterConsiderNewRules","hideRules":["#adfox_1"]}"##)
            .unwrap();
        assert!(s.dom().has_class(ad, "cf-hide"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = FilterConfig {
            batch_size: 0,
            ..FilterConfig::default()
        };
        let result = PageSession::new(Document::new(), Vec::new(), "example.com", config);
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_teardown_report() {
        let (doc, _) = page();
        let mut s = session(doc);
        s.start();
        init(&mut s);
        let report = s.teardown();
        assert_eq!(report.page_host, "www.example.com");
        assert_eq!(report.messages_sent, 2);
        assert_eq!(report.seen_ids, 1);
        assert_eq!(report.seen_classes, 2);
        assert!(report.observing);
    }
}
