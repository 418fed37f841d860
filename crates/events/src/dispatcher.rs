//! Application-level event dispatcher (registered-callback pattern).
//!
//! Domain operations return events; they never trigger side effects
//! themselves. The application registers callbacks here and dispatches the
//! events after the owning unit of work has committed, decoupling cause
//! (a ledger mutation) from effect (a broadcast, a dashboard refresh).

use tracing::debug;

use crate::Event;

/// Callback invoked for events whose type matches the registered pattern.
pub type EventCallback<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Routes events to registered callbacks by event-type pattern.
///
/// Patterns, in match order per callback:
/// - exact: `"inventory.batch_consumed"`
/// - category: `"inventory.*"` matches every `inventory.`-prefixed type
/// - wildcard: `"*"` matches everything
pub struct EventDispatcher<E: Event> {
    handlers: Vec<(String, EventCallback<E>)>,
}

impl<E: Event> EventDispatcher<E> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a callback for an event-type pattern.
    pub fn on<F>(&mut self, pattern: impl Into<String>, callback: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.handlers.push((pattern.into(), Box::new(callback)));
    }

    /// Dispatch one event to every matching callback.
    ///
    /// Returns the number of callbacks invoked.
    pub fn dispatch(&self, event: &E) -> usize {
        let event_type = event.event_type();
        let mut invoked = 0;

        for (pattern, callback) in &self.handlers {
            if pattern_matches(pattern, event_type) {
                callback(event);
                invoked += 1;
            }
        }

        if invoked == 0 {
            debug!(event_type, "no callback registered for event");
        }

        invoked
    }

    /// Dispatch a batch of events in order.
    pub fn dispatch_all<'a>(&self, events: impl IntoIterator<Item = &'a E>) -> usize {
        events.into_iter().map(|e| self.dispatch(e)).sum()
    }
}

impl<E: Event> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn pattern_matches(pattern: &str, event_type: &str) -> bool {
    if pattern == "*" || pattern == event_type {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(".*") {
        return event_type
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'));
    }
    false
}
