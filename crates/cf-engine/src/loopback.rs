//! In-process host for a page session
//!
//! Plays the part of the browser and the native engine at once: delivers
//! the session's outbound messages to a [`CosmeticEngine`], feeds the
//! replies back, reports document insertions, and fires the session's
//! timers on a [`VirtualClock`] until nothing is left to do.

use serde::Serialize;

use cf_core::dom::Document;
use cf_core::{OutboundMessage, PageSession, SessionReport, VirtualClock};

use crate::engine::CosmeticEngine;
use crate::error::EngineError;

/// Default cap on timer ticks for one run.
pub const DEFAULT_MAX_TICKS: usize = 10_000;

pub type DocumentSession = PageSession<Document, Vec<OutboundMessage>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopbackReport {
    pub session: SessionReport,
    /// Messages sent by the page.
    pub outbound: usize,
    /// Messages the engine sent back.
    pub inbound: usize,
    pub ticks: usize,
    pub elapsed_ms: u64,
    /// True when the tick cap stopped the run before the queue went idle.
    pub truncated: bool,
}

pub struct Loopback<'a> {
    engine: &'a CosmeticEngine,
    clock: VirtualClock,
    max_ticks: usize,
    outbound: usize,
    inbound: usize,
    ticks: usize,
}

impl<'a> Loopback<'a> {
    pub fn new(engine: &'a CosmeticEngine) -> Self {
        Self {
            engine,
            clock: VirtualClock::new(),
            max_ticks: DEFAULT_MAX_TICKS,
            outbound: 0,
            inbound: 0,
            ticks: 0,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: usize) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    /// Start the session and run it until it is idle.
    pub fn run(&mut self, session: &mut DocumentSession) -> Result<LoopbackReport, EngineError> {
        session.start();
        self.settle(session)
    }

    /// Deliver pending messages and insertions, then fire timers one at a
    /// time until none are left. Call again after mutating the document.
    pub fn settle(&mut self, session: &mut DocumentSession) -> Result<LoopbackReport, EngineError> {
        let mut truncated = false;

        loop {
            if self.exchange(session)? {
                continue;
            }

            if self.clock.is_idle() {
                break;
            }
            if self.ticks >= self.max_ticks {
                log::warn!("Stopping after {} ticks with timers pending", self.ticks);
                truncated = true;
                break;
            }

            self.clock.tick();
            self.ticks += 1;
            if let Some(delay) = session.on_timer() {
                self.clock.schedule(delay);
            }
        }

        Ok(LoopbackReport {
            session: session.report(),
            outbound: self.outbound,
            inbound: self.inbound,
            ticks: self.ticks,
            elapsed_ms: self.clock.now().as_millis() as u64,
            truncated,
        })
    }

    /// One round of insertion reports and message delivery. Returns whether
    /// anything was exchanged.
    fn exchange(&mut self, session: &mut DocumentSession) -> Result<bool, EngineError> {
        let insertions = session.dom_mut().take_insertions();
        if !insertions.is_empty() {
            session.on_nodes_added(&insertions);
        }

        let messages: Vec<OutboundMessage> = session.sink_mut().drain(..).collect();
        if messages.is_empty() {
            return Ok(false);
        }

        for message in &messages {
            self.outbound += 1;
            for reply in self.engine.respond(message) {
                self.inbound += 1;
                log::debug!("Delivering {}", reply.kind());
                let dispatch = session.handle_message(reply)?;
                if let Some(delay) = dispatch.wake_after {
                    self.clock.schedule(delay);
                }
            }
        }
        Ok(true)
    }
}
