//! `larder-events` — event trait, pub/sub bus, dispatcher, and outbox.
//!
//! Domain crates emit facts; this crate carries them: the [`Event`] trait
//! tags them, the [`Outbox`] holds them until the owning unit of work
//! commits, the [`EventDispatcher`] routes them to registered callbacks, and
//! the [`EventBus`] moves outbound messages to external subscribers.

pub mod bus;
pub mod dispatcher;
pub mod event;
pub mod in_memory_bus;
pub mod outbox;

pub use bus::{EventBus, Subscription};
pub use dispatcher::{EventCallback, EventDispatcher};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use outbox::Outbox;
