//! Fire-and-forget publication of broadcast events.

use tracing::{debug, warn};

use larder_events::{Event, EventBus};

use crate::event::{BroadcastEvent, ChannelMessage};

/// Publishes broadcast events to their channels over any [`EventBus`].
///
/// Delivery is best-effort, at-most-once. Publication must run strictly
/// after the owning unit of work has committed; a publish failure is logged
/// and swallowed, never propagated as a domain error.
pub struct BroadcastDispatcher<B> {
    bus: B,
}

impl<B> BroadcastDispatcher<B>
where
    B: EventBus<ChannelMessage>,
{
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Publish one event. Infallible by design; the transport error, if any,
    /// ends up in the log.
    pub fn publish(&self, event: &BroadcastEvent) {
        let message = event.to_message();
        let channel = message.channel.clone();
        match self.bus.publish(message) {
            Ok(()) => debug!(channel, event = event.event_type(), "broadcast published"),
            Err(e) => warn!(
                channel,
                event = event.event_type(),
                error = ?e,
                "broadcast publish failed"
            ),
        }
    }

    /// Publish a batch of events in order.
    pub fn publish_all<'a>(&self, events: impl IntoIterator<Item = &'a BroadcastEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}
