//! Virtual time for driving a session without real timers.
//!
//! Hosts with a real event loop (the wasm binding) turn a session's wake
//! requests into `setTimeout` calls. Everything else uses a [`VirtualClock`]
//! and advances it explicitly.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

use crate::dom::Dom;
use crate::session::{MessageSink, PageSession};

/// Single-threaded timer queue over virtual time.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Duration,
    next_id: u64,
    timers: BinaryHeap<Reverse<(Duration, u64)>>,
    fired: usize,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time since the clock was created.
    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Register a timer due `delay` from now. Returns its id.
    pub fn schedule(&mut self, delay: Duration) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.timers.push(Reverse((self.now + delay, id)));
        id
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.peek().map(|Reverse((deadline, _))| *deadline)
    }

    /// Jump to the earliest timer and pop it. Returns its id.
    pub fn tick(&mut self) -> Option<u64> {
        let Reverse((deadline, id)) = self.timers.pop()?;
        self.now = self.now.max(deadline);
        self.fired += 1;
        Some(id)
    }

    /// Move time forward and pop every timer due by then, in deadline order.
    pub fn advance(&mut self, by: Duration) -> Vec<u64> {
        let target = self.now + by;
        let mut due = Vec::new();
        while matches!(self.next_deadline(), Some(deadline) if deadline <= target) {
            if let Some(id) = self.tick() {
                due.push(id);
            }
        }
        self.now = target;
        due
    }

    /// Timers fired so far.
    pub fn fired(&self) -> usize {
        self.fired
    }
}

/// Fire timers into the session until it stops asking for more or
/// `max_ticks` timers have fired. Returns the number of ticks run.
pub fn run_until_idle<D: Dom, S: MessageSink>(
    session: &mut PageSession<D, S>,
    clock: &mut VirtualClock,
    max_ticks: usize,
) -> usize {
    let mut ticks = 0;
    while ticks < max_ticks && clock.tick().is_some() {
        ticks += 1;
        if let Some(delay) = session.on_timer() {
            clock.schedule(delay);
        }
    }
    ticks
}
