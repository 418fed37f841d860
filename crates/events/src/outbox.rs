//! Post-commit event buffering (outbox-style decoupling).
//!
//! A unit of work records the facts it produced here while its locks are
//! held; the caller drains the outbox through the dispatcher only after the
//! state change has committed. An aborted unit of work simply drops its
//! outbox, so no broadcast ever describes a rolled-back mutation.

use crate::{Event, EventDispatcher};

/// Buffer of events awaiting post-commit dispatch.
#[derive(Debug)]
pub struct Outbox<E> {
    pending: Vec<E>,
}

impl<E> Outbox<E> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Record one event for later dispatch.
    pub fn record(&mut self, event: E) {
        self.pending.push(event);
    }

    /// Record a batch of events in order.
    pub fn record_all(&mut self, events: impl IntoIterator<Item = E>) {
        self.pending.extend(events);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take all pending events, leaving the outbox empty.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
    }
}

impl<E: Event> Outbox<E> {
    /// Drain every pending event through the dispatcher.
    ///
    /// Call this only after the owning unit of work has committed. Returns
    /// the number of callback invocations.
    pub fn flush_into(&mut self, dispatcher: &EventDispatcher<E>) -> usize {
        let events = self.drain();
        dispatcher.dispatch_all(events.iter())
    }
}

impl<E> Default for Outbox<E> {
    fn default() -> Self {
        Self::new()
    }
}
